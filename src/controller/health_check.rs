use std::sync::Arc;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Router};
use tracing::warn;
use crate::controller::AppState;
use crate::services::reservation_service::ReservationService;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health_check))
        .route_layer(Extension(app_state.reservation_service))
}

/// 200 when the database answers, 503 otherwise.
async fn get_health_check(
    Extension(reservation_service): Extension<Arc<ReservationService>>,
) -> Result<StatusCode, StatusCode>
{
    match reservation_service.health().await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            warn!("Health check failed due to: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
