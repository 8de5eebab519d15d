use async_trait::async_trait;

use crate::errors::PersistenceError;
use crate::models::reservation::{ListingId, Reservation, ReservationStatus, UserId};

pub mod connection;
pub mod memory_repo;
pub mod postgres_repo;

/// Raw reservation storage. Writes are visible to the next read.
#[async_trait]
pub trait ReservationGateway: Send + Sync {
    /// Insert a pending reservation for an existing listing and user.
    async fn create_reservation(
        &self,
        listing_id: &ListingId,
        user_id: &UserId,
    ) -> Result<Reservation, PersistenceError>;

    async fn get_reservation(&self, id: &str) -> Result<Reservation, PersistenceError>;

    /// All reservations of a user, newest first.
    async fn list_user_reservations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Reservation>, PersistenceError>;

    /// Move a reservation forward; anything but pending -> confirmed/cancelled
    /// is refused.
    async fn update_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> Result<Reservation, PersistenceError>;

    async fn ping(&self) -> Result<(), PersistenceError>;
}
