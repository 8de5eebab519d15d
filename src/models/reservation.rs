use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::IdentifierError;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Identifier of an annonce (listing) owned by the listings subsystem.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ListingId(String);

/// Identifier of the user requesting a reservation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(String);

impl ListingId {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_identifier(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate_identifier(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Characters an identifier may not carry: they split or end a route path.
const RESERVED_CHARACTERS: [char; 3] = ['/', '?', '#'];

/// Trims the raw value and checks it is a non-empty token of at most
/// `MAX_IDENTIFIER_LEN` characters, free of whitespace, control characters
/// and path separators. Ids belong to other subsystems, so anything else goes.
pub(crate) fn validate_identifier(raw: &str) -> Result<String, IdentifierError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty);
    }
    let len = trimmed.chars().count();
    if len > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong {
            len,
            max: MAX_IDENTIFIER_LEN,
        });
    }
    if let Some(c) = trimmed
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || RESERVED_CHARACTERS.contains(c))
    {
        return Err(IdentifierError::InvalidCharacter(c));
    }
    Ok(trimmed.to_string())
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Only a pending reservation may move, and only forward.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        matches!(
            (self, next),
            (ReservationStatus::Pending, ReservationStatus::Confirmed)
                | (ReservationStatus::Pending, ReservationStatus::Cancelled)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(format!("unknown reservation status: {}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub id: String,
    pub listing_id: ListingId,
    pub user_id: UserId,
    pub status: ReservationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Reservation {
    /// A fresh pending reservation with a generated id, stamped now.
    pub fn new_pending(listing_id: ListingId, user_id: UserId) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            listing_id,
            user_id,
            status: ReservationStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_trimmed() {
        let id = ListingId::parse("  42 ").unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn blank_identifier_is_rejected() {
        assert_eq!(ListingId::parse("   "), Err(IdentifierError::Empty));
        assert_eq!(UserId::parse(""), Err(IdentifierError::Empty));
    }

    #[test]
    fn malformed_identifier_is_rejected() {
        assert_eq!(
            ListingId::parse("42 drop"),
            Err(IdentifierError::InvalidCharacter(' '))
        );
        assert_eq!(
            ListingId::parse("42/../1"),
            Err(IdentifierError::InvalidCharacter('/'))
        );
        assert_eq!(
            UserId::parse("7\u{0}"),
            Err(IdentifierError::InvalidCharacter('\u{0}'))
        );
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(matches!(
            UserId::parse(&long),
            Err(IdentifierError::TooLong { .. })
        ));
    }

    #[test]
    fn identifiers_from_other_systems_are_accepted() {
        for raw in ["jane.doe@example.com", "annonce:2024.117", "bénédicte", "A-1_b"] {
            assert_eq!(UserId::parse(raw).unwrap().as_str(), raw);
        }
        let at_cap = "é".repeat(MAX_IDENTIFIER_LEN);
        assert!(ListingId::parse(&at_cap).is_ok());
    }

    #[test]
    fn status_only_moves_forward_from_pending() {
        use ReservationStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn status_round_trips_through_its_column_text() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>(), Ok(status));
        }
        assert!("archived".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn reservation_serialises_timestamp_as_rfc3339() {
        let rsvp = Reservation::new_pending(
            ListingId::parse("42").unwrap(),
            UserId::parse("7").unwrap(),
        );
        let value = serde_json::to_value(&rsvp).unwrap();
        assert_eq!(value["listing_id"], "42");
        assert_eq!(value["status"], "pending");
        assert!(value["created_at"].as_str().unwrap().contains('T'));
    }
}
