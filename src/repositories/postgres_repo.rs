use async_trait::async_trait;
use bb8_postgres::bb8::{PooledConnection, RunError};
use bb8_postgres::tokio_postgres::error::SqlState;
use bb8_postgres::tokio_postgres::{self, NoTls, Row};
use bb8_postgres::PostgresConnectionManager;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::errors::{ForeignKey, PersistenceError};
use crate::models::reservation::{ListingId, Reservation, ReservationStatus, UserId};
use crate::repositories::connection::Connection;
use crate::repositories::ReservationGateway;

const RESERVATION_COLUMNS: &str = "id, listing_id, user_id, status, created_at";

pub struct PostgresReservationRepo {
    connection: Connection,
}

impl PostgresReservationRepo {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// A single attempt; a pool that cannot hand out a connection in time
    /// means the store is gone.
    async fn get_postgres_connection(
        &self,
    ) -> Result<PooledConnection<'_, PostgresConnectionManager<NoTls>>, PersistenceError> {
        match self.connection.pool().get().await {
            Ok(conn) => Ok(conn),
            Err(RunError::User(e)) => {
                warn!("Failed to retrieve postgres connection due to: {}", e);
                Err(PersistenceError::ConnectionLost)
            }
            Err(RunError::TimedOut) => {
                warn!("Timed out waiting for a postgres connection");
                Err(PersistenceError::ConnectionLost)
            }
        }
    }

    async fn reservation_exists(&self, id: &str) -> Result<bool, PersistenceError> {
        let conn = self.get_postgres_connection().await?;
        let row = conn
            .query_opt("SELECT 1 FROM reservations WHERE id = $1", &[&id])
            .await
            .map_err(map_query_error)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl ReservationGateway for PostgresReservationRepo {
    async fn create_reservation(
        &self,
        listing_id: &ListingId,
        user_id: &UserId,
    ) -> Result<Reservation, PersistenceError> {
        let conn = self.get_postgres_connection().await?;
        let rsvp = Reservation::new_pending(listing_id.clone(), user_id.clone());
        let stmt = format!(
            "INSERT INTO reservations (id, listing_id, user_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            RESERVATION_COLUMNS
        );

        let row = conn
            .query_one(
                &stmt,
                &[
                    &rsvp.id,
                    &listing_id.as_str(),
                    &user_id.as_str(),
                    &rsvp.status.as_str(),
                    &rsvp.created_at,
                ],
            )
            .await
            .map_err(|e| {
                warn!(
                    "Failed to add reservation on listing: {} for user: {}, due to: {}",
                    listing_id, user_id, e
                );
                map_query_error(e)
            })?;

        debug!("Stored reservation {}", rsvp.id);
        parse_row_into_reservation(&row)
    }

    async fn get_reservation(&self, id: &str) -> Result<Reservation, PersistenceError> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!("SELECT {} FROM reservations WHERE id = $1", RESERVATION_COLUMNS);

        let row = conn
            .query_opt(&stmt, &[&id])
            .await
            .map_err(map_query_error)?
            .ok_or(PersistenceError::NotFound)?;
        parse_row_into_reservation(&row)
    }

    async fn list_user_reservations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Reservation>, PersistenceError> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!(
            "SELECT {} FROM reservations WHERE user_id = $1 ORDER BY created_at DESC",
            RESERVATION_COLUMNS
        );

        let rows = conn
            .query(&stmt, &[&user_id.as_str()])
            .await
            .map_err(|e| {
                warn!("Failed to retrieve reservations for user: {}, due to: {}", user_id, e);
                map_query_error(e)
            })?;

        rows.iter().map(parse_row_into_reservation).collect()
    }

    async fn update_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> Result<Reservation, PersistenceError> {
        let current = self.get_reservation(id).await?;
        if !current.status.can_transition_to(status) {
            return Err(PersistenceError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let conn = self.get_postgres_connection().await?;
        // The status guard keeps a concurrent transition from being overwritten.
        let stmt = format!(
            "UPDATE reservations SET status = $1 WHERE id = $2 AND status = 'pending' RETURNING {}",
            RESERVATION_COLUMNS
        );
        let row = conn
            .query_opt(&stmt, &[&status.as_str(), &id])
            .await
            .map_err(map_query_error)?;
        drop(conn);

        match row {
            Some(row) => parse_row_into_reservation(&row),
            None if self.reservation_exists(id).await? => {
                let raced = self.get_reservation(id).await?;
                Err(PersistenceError::InvalidTransition {
                    from: raced.status,
                    to: status,
                })
            }
            None => Err(PersistenceError::NotFound),
        }
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        let conn = self.get_postgres_connection().await?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(map_query_error)?;
        Ok(())
    }
}

fn map_query_error(e: tokio_postgres::Error) -> PersistenceError {
    if let Some(db) = e.as_db_error() {
        if db.code() == &SqlState::FOREIGN_KEY_VIOLATION {
            let reference = match db.constraint() {
                Some(name) if name.contains("user_id") => ForeignKey::Requester,
                _ => ForeignKey::Listing,
            };
            return PersistenceError::ForeignKeyViolation { reference };
        }
        return PersistenceError::Unexpected(db.message().to_string());
    }
    if e.is_closed() {
        return PersistenceError::ConnectionLost;
    }
    PersistenceError::Unexpected(e.to_string())
}

fn parse_row_into_reservation(row: &Row) -> Result<Reservation, PersistenceError> {
    let corrupt = |e: tokio_postgres::Error| PersistenceError::Unexpected(e.to_string());

    let listing_id: String = row.try_get("listing_id").map_err(corrupt)?;
    let user_id: String = row.try_get("user_id").map_err(corrupt)?;
    let status: String = row.try_get("status").map_err(corrupt)?;
    let created_at: OffsetDateTime = row.try_get("created_at").map_err(corrupt)?;

    Ok(Reservation {
        id: row.try_get("id").map_err(corrupt)?,
        listing_id: ListingId::parse(&listing_id)
            .map_err(|e| PersistenceError::Unexpected(e.to_string()))?,
        user_id: UserId::parse(&user_id)
            .map_err(|e| PersistenceError::Unexpected(e.to_string()))?,
        status: status.parse().map_err(PersistenceError::Unexpected)?,
        created_at,
    })
}
