//! Error types shared across the gateway, service and presentation layers.
//!
//! Every layer returns these as values; only the presentation adapter and the
//! HTTP controllers turn them into user-visible text.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::reservation::ReservationStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier is {len} characters long, at most {max} allowed")]
    TooLong { len: usize, max: usize },
    #[error("identifier contains invalid character {0:?}")]
    InvalidCharacter(char),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read database config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse database config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no database settings for environment {0:?}")]
    UnknownEnvironment(String),
    #[error("unsupported database dialect {0:?}, only postgres is available")]
    UnsupportedDialect(String),
    #[error("TLS connections are not supported, remove dialectOptions.ssl")]
    TlsUnsupported,
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: String, value: String },
}

/// Failure to establish the store connection at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("database at {host}:{port} is unreachable: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("database rejected the credentials: {0}")]
    Rejected(String),
    #[error("timed out connecting to the database")]
    TimedOut,
}

/// Which foreign reference of a reservation row was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKey {
    Listing,
    Requester,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("referenced {reference:?} does not exist")]
    ForeignKeyViolation { reference: ForeignKey },
    #[error("connection to the database is unavailable")]
    ConnectionLost,
    #[error("reservation not found")]
    NotFound,
    #[error("reservation cannot move from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    #[error("database did not answer in time")]
    TimedOut,
    #[error("unexpected database error: {0}")]
    Unexpected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("invalid listing: {0}")]
    InvalidListing(IdentifierError),
    #[error("invalid requester: {0}")]
    InvalidRequester(IdentifierError),
    #[error(transparent)]
    PersistenceFailure(#[from] PersistenceError),
}

/// Navigation parameters that could not be turned into a typed request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("missing route parameter {0:?}")]
    Missing(&'static str),
}

/// Why a confirmation from the client did not produce a reservation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("no authenticated user")]
    Unauthenticated,
    #[error(transparent)]
    Reservation(#[from] ReservationError),
}
