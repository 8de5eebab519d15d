use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::errors::{ConfirmError, ForeignKey, ParamsError, PersistenceError, ReservationError};
use crate::helpers::notifier::{NotificationKind, Notifier};
use crate::helpers::route_params::RouteParams;
use crate::helpers::session::Session;
use crate::models::reservation::Reservation;
use crate::services::reservation_service::ReservationService;

/// Where the client should go once the outcome has been shown.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Navigation {
    Back,
    Stay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub listing_id: String,
}

impl ConfirmRequest {
    /// Requires the `id` parameter to be present. Its format is checked by the
    /// reservation service.
    pub fn from_params(params: &RouteParams) -> Result<Self, ParamsError> {
        let listing_id = params.get("id").ok_or(ParamsError::Missing("id"))?;
        Ok(Self {
            listing_id: listing_id.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct ConfirmOutcome {
    pub navigation: Navigation,
    pub result: Result<Reservation, ConfirmError>,
}

pub struct ConfirmReservationAdapter {
    service: Arc<ReservationService>,
}

impl ConfirmReservationAdapter {
    pub fn new(service: Arc<ReservationService>) -> Self {
        Self { service }
    }

    /// Books the listing named by the route for the signed-in user and tells
    /// the user how it went. Goes back on success, stays otherwise.
    pub async fn on_confirm(
        &self,
        params: &RouteParams,
        session: &dyn Session,
        notifier: &dyn Notifier,
    ) -> ConfirmOutcome {
        let result = self.confirm(params, session).await;
        let navigation = match &result {
            Ok(rsvp) => {
                notifier.notify(
                    "Your reservation request has been sent.",
                    NotificationKind::Success,
                );
                debug!("Confirmation for listing: {} succeeded", rsvp.listing_id);
                Navigation::Back
            }
            Err(e) => {
                notifier.notify(user_message(e), NotificationKind::Error);
                Navigation::Stay
            }
        };
        ConfirmOutcome { navigation, result }
    }

    async fn confirm(
        &self,
        params: &RouteParams,
        session: &dyn Session,
    ) -> Result<Reservation, ConfirmError> {
        let request = ConfirmRequest::from_params(params)?;
        let user_id = session
            .current_user()
            .ok_or(ConfirmError::Unauthenticated)?;
        Ok(self.service.reserve(&request.listing_id, &user_id).await?)
    }
}

pub fn user_message(err: &ConfirmError) -> &'static str {
    match err {
        ConfirmError::Params(ParamsError::Missing(_)) => "No listing was selected.",
        ConfirmError::Unauthenticated => "You need to be signed in to book this listing.",
        ConfirmError::Reservation(ReservationError::InvalidListing(_)) => {
            "This listing could not be identified."
        }
        ConfirmError::Reservation(ReservationError::InvalidRequester(_)) => {
            "Your account could not be identified, please sign in again."
        }
        ConfirmError::Reservation(ReservationError::PersistenceFailure(e)) => match e {
            PersistenceError::ForeignKeyViolation {
                reference: ForeignKey::Listing,
            } => "This listing is no longer available.",
            PersistenceError::ForeignKeyViolation {
                reference: ForeignKey::Requester,
            } => "Your account could not be found, please sign in again.",
            PersistenceError::ConnectionLost | PersistenceError::TimedOut => {
                "The service is unreachable right now, please try again later."
            }
            _ => "Something went wrong while booking, please try again.",
        },
    }
}
