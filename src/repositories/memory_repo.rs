use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::{ForeignKey, PersistenceError};
use crate::models::reservation::{ListingId, Reservation, ReservationStatus, UserId};
use crate::repositories::ReservationGateway;

/// Gateway over process memory, with the same foreign key and transition
/// rules as the postgres schema. Availability can be switched off to act as a
/// lost connection.
#[derive(Default)]
pub struct InMemoryReservationGateway {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

#[derive(Default)]
struct MemoryState {
    listings: HashSet<String>,
    users: HashSet<String>,
    reservations: Vec<Reservation>,
}

impl InMemoryReservationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, id: &str) -> Self {
        self.state.get_mut().listings.insert(id.to_string());
        self
    }

    pub fn with_user(mut self, id: &str) -> Self {
        self.state.get_mut().users.insert(id.to_string());
        self
    }

    pub async fn add_listing(&self, id: &str) {
        self.state.write().await.listings.insert(id.to_string());
    }

    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Number of gateway operations invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    fn enter(&self) -> Result<(), PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(PersistenceError::ConnectionLost);
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationGateway for InMemoryReservationGateway {
    async fn create_reservation(
        &self,
        listing_id: &ListingId,
        user_id: &UserId,
    ) -> Result<Reservation, PersistenceError> {
        self.enter()?;
        let mut state = self.state.write().await;
        if !state.listings.contains(listing_id.as_str()) {
            return Err(PersistenceError::ForeignKeyViolation {
                reference: ForeignKey::Listing,
            });
        }
        if !state.users.contains(user_id.as_str()) {
            return Err(PersistenceError::ForeignKeyViolation {
                reference: ForeignKey::Requester,
            });
        }
        let rsvp = Reservation::new_pending(listing_id.clone(), user_id.clone());
        state.reservations.push(rsvp.clone());
        Ok(rsvp)
    }

    async fn get_reservation(&self, id: &str) -> Result<Reservation, PersistenceError> {
        self.enter()?;
        self.state
            .read()
            .await
            .reservations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(PersistenceError::NotFound)
    }

    async fn list_user_reservations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Reservation>, PersistenceError> {
        self.enter()?;
        let state = self.state.read().await;
        Ok(state
            .reservations
            .iter()
            .rev()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> Result<Reservation, PersistenceError> {
        self.enter()?;
        let mut state = self.state.write().await;
        let rsvp = state
            .reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PersistenceError::NotFound)?;
        if !rsvp.status.can_transition_to(status) {
            return Err(PersistenceError::InvalidTransition {
                from: rsvp.status,
                to: status,
            });
        }
        rsvp.status = status;
        Ok(rsvp.clone())
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        self.enter()
    }
}
