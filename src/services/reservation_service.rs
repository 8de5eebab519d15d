use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{PersistenceError, ReservationError};
use crate::models::reservation::{ListingId, Reservation, ReservationStatus, UserId};
use crate::repositories::ReservationGateway;

pub type ReservationResult = Result<Reservation, ReservationError>;

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Repeated reservations for the same listing and user inside this window
    /// return the first reservation. Zero disables the check.
    pub dedup_window: Duration,
    /// Upper bound for a single gateway call.
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

type RecentKey = (ListingId, UserId);
type RecentSlot = Arc<Mutex<Option<(Instant, Reservation)>>>;

pub struct ReservationService {
    gateway: Arc<dyn ReservationGateway>,
    settings: ServiceSettings,
    recent: Mutex<HashMap<RecentKey, RecentSlot>>,
}

impl ReservationService {
    pub fn new(gateway: Arc<dyn ReservationGateway>, settings: ServiceSettings) -> Self {
        Self {
            gateway,
            settings,
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Validates both identifiers, then stores a pending reservation. Nothing
    /// reaches the gateway when validation fails.
    pub async fn reserve(&self, listing_id: &str, user_id: &str) -> ReservationResult {
        let listing_id = ListingId::parse(listing_id).map_err(ReservationError::InvalidListing)?;
        let user_id = UserId::parse(user_id).map_err(ReservationError::InvalidRequester)?;

        if self.settings.dedup_window.is_zero() {
            return self.create(&listing_id, &user_id).await;
        }

        let key = (listing_id, user_id);
        let slot = self.recent_slot(&key).await;
        // Held across the insert so overlapping submissions for the same pair
        // see each other. Other pairs only share the map lock above.
        let mut recent = slot.lock().await;
        let now = Instant::now();

        if let Some((at, existing)) = recent.as_ref() {
            if now.duration_since(*at) < self.settings.dedup_window {
                if let Some(rsvp) = self.still_pending(&existing.id).await? {
                    debug!(
                        "Returning reservation {} for repeated request on listing: {} by user: {}",
                        rsvp.id, key.0, key.1
                    );
                    return Ok(rsvp);
                }
            }
        }

        let rsvp = self.create(&key.0, &key.1).await?;
        *recent = Some((now, rsvp.clone()));
        Ok(rsvp)
    }

    /// Slot of the pair, created on demand. Expired slots nobody is using are
    /// dropped on the way.
    async fn recent_slot(&self, key: &RecentKey) -> RecentSlot {
        let mut recent = self.recent.lock().await;
        let now = Instant::now();
        let window = self.settings.dedup_window;
        recent.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => matches!(entry.as_ref(), Some((at, _)) if now.duration_since(*at) < window),
                Err(_) => true,
            }
        });
        recent.entry(key.clone()).or_default().clone()
    }

    /// Re-reads a remembered reservation. Only a reservation that is still
    /// pending may answer a repeated request.
    async fn still_pending(&self, id: &str) -> Result<Option<Reservation>, ReservationError> {
        match self.bounded(self.gateway.get_reservation(id)).await {
            Ok(rsvp) if rsvp.status == ReservationStatus::Pending => Ok(Some(rsvp)),
            Ok(_) | Err(PersistenceError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, listing_id: &ListingId, user_id: &UserId) -> ReservationResult {
        let rsvp = self
            .bounded(self.gateway.create_reservation(listing_id, user_id))
            .await
            .map_err(|e| {
                warn!(
                    "Failed to reserve listing: {} for user: {}, due to: {}",
                    listing_id, user_id, e
                );
                e
            })?;
        info!(
            "Reservation {} created on listing: {} for user: {}",
            rsvp.id, listing_id, user_id
        );
        Ok(rsvp)
    }

    pub async fn find(&self, id: &str) -> ReservationResult {
        Ok(self.bounded(self.gateway.get_reservation(id)).await?)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Reservation>, ReservationError> {
        let user_id = UserId::parse(user_id).map_err(ReservationError::InvalidRequester)?;
        Ok(self
            .bounded(self.gateway.list_user_reservations(&user_id))
            .await?)
    }

    pub async fn confirm(&self, id: &str) -> ReservationResult {
        self.transition(id, ReservationStatus::Confirmed).await
    }

    pub async fn cancel(&self, id: &str) -> ReservationResult {
        self.transition(id, ReservationStatus::Cancelled).await
    }

    async fn transition(&self, id: &str, status: ReservationStatus) -> ReservationResult {
        let rsvp = self
            .bounded(self.gateway.update_status(id, status))
            .await?;
        info!("Reservation {} is now {}", rsvp.id, rsvp.status);
        Ok(rsvp)
    }

    pub async fn health(&self) -> Result<(), PersistenceError> {
        self.bounded(self.gateway.ping()).await
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, PersistenceError>
    where
        F: Future<Output = Result<T, PersistenceError>>,
    {
        match tokio::time::timeout(self.settings.request_timeout, call).await {
            Ok(res) => res,
            Err(_) => Err(PersistenceError::TimedOut),
        }
    }
}
