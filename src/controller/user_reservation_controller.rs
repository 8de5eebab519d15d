use std::sync::Arc;
use axum::{Extension, Json, Router};
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use crate::controller::{status_for_confirm_error, status_for_reservation_error, AppState};
use crate::helpers::notifier::CollectingNotifier;
use crate::helpers::route_params::RouteParams;
use crate::helpers::session::HeaderSession;
use crate::presentation::confirm_reservation::ConfirmReservationAdapter;
use crate::services::reservation_service::ReservationService;

pub fn router(app_state: AppState) -> Router {
    let adapter = Arc::new(ConfirmReservationAdapter::new(
        app_state.reservation_service.clone()
    ));

    Router::new()
        .route("/", get(get_all_reservations).post(confirm_reservation))
        .route("/:id", get(get_reservation))
        .route("/:id/confirm", put(accept_reservation))
        .route("/:id/cancel", put(cancel_reservation))
        .route_layer(Extension(app_state.reservation_service))
        .route_layer(Extension(adapter))
}

/// The booking button of the listing screen: `?id=<listing>` plus the
/// session header.
pub async fn confirm_reservation(
    Extension(adapter): Extension<Arc<ConfirmReservationAdapter>>,
    headers: HeaderMap,
    Query(params): Query<RouteParams>,
) -> impl IntoResponse {
    let session = HeaderSession::from_headers(&headers);
    let notifier = CollectingNotifier::default();

    let outcome = adapter
        .on_confirm(&params, &session, &notifier)
        .await;

    let status = match &outcome.result {
        Ok(_) => StatusCode::CREATED,
        Err(e) => {
            warn!("Something went wrong confirming reservation due to: {}", e);
            status_for_confirm_error(e)
        }
    };

    (
        status,
        Json(json!({
            "navigation": outcome.navigation,
            "notifications": notifier.take(),
            "reservation": outcome.result.ok(),
        })),
    ).into_response()
}

pub async fn get_reservation(
    Extension(reservation_service): Extension<Arc<ReservationService>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let reservation_res = reservation_service
        .find(&id)
        .await;

    return match reservation_res {
        Ok(reservation) => {
            (StatusCode::OK, Json(json!(reservation))).into_response()
        }
        Err(e) => {
            warn!("Something went wrong retrieving reservation: {}, due to: {}", id, e);
            (status_for_reservation_error(&e), "Failed to retrieve reservation, please try again.").into_response()
        }
    };
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GetReservationQuery {
    pub user_id: String,
}

pub async fn get_all_reservations(
    Extension(reservation_service): Extension<Arc<ReservationService>>,
    Query(query): Query<GetReservationQuery>,
) -> impl IntoResponse {
    let user_reservations_res = reservation_service
        .list_for_user(&query.user_id)
        .await;

    return match user_reservations_res {
        Ok(reservations) => {
            (StatusCode::OK, Json(json!(reservations))).into_response()
        }
        Err(e) => {
            warn!("Something went wrong retrieving user's reservations due to: {}", e);
            (status_for_reservation_error(&e), "Failed to retrieve reservations, please try again.").into_response()
        }
    };
}

pub async fn accept_reservation(
    Extension(reservation_service): Extension<Arc<ReservationService>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let confirm_res = reservation_service
        .confirm(&id)
        .await;

    return match confirm_res {
        Ok(reservation) => {
            (StatusCode::OK, Json(json!(reservation))).into_response()
        }
        Err(e) => {
            warn!("Something went wrong confirming reservation: {}, due to: {}", id, e);
            (status_for_reservation_error(&e), "Failed to confirm reservation.").into_response()
        }
    };
}

pub async fn cancel_reservation(
    Extension(reservation_service): Extension<Arc<ReservationService>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let cancel_res = reservation_service
        .cancel(&id)
        .await;

    return match cancel_res {
        Ok(reservation) => {
            (StatusCode::OK, Json(json!(reservation))).into_response()
        }
        Err(e) => {
            warn!("Something went wrong cancelling reservation: {}, due to: {}", id, e);
            (status_for_reservation_error(&e), "Failed to cancel reservation.").into_response()
        }
    };
}
