use std::future::Future;
use std::sync::Arc;
use anyhow::Context;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use crate::config::Config;
use crate::errors::{ConfirmError, PersistenceError, ReservationError};
use crate::helpers::handler_404::page_not_found_handler;
use crate::helpers::session::USER_HEADER;
use crate::services::reservation_service::ReservationService;

pub mod conversation_controller;
pub mod health_check;
pub mod user_reservation_controller;

#[derive(Clone)]
pub struct AppState {
    pub reservation_service: Arc<ReservationService>,
}

pub async fn serve<F>(
    app_state: AppState,
    config: &Config,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let origins: Vec<HeaderValue> = config
        .origin_urls
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", s);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    let application = router_endpoints(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::OPTIONS
                        ])
                        .allow_origin(origins)
                        .allow_headers([
                            AUTHORIZATION,
                            CONTENT_TYPE,
                            HeaderName::from_static(USER_HEADER),
                        ])
                )
        );

    info!("API server listening on: {}", config.bind_address);
    axum::Server::bind(&config.bind_address)
        .serve(application.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("Error spinning up the API server")
}

pub fn router_endpoints(app_state: AppState) -> Router {
    Router::new()
        .merge(health_check::router(app_state.clone()))
        .nest("/reservations", user_reservation_controller::router(app_state))
        .nest("/conversation", conversation_controller::router())
        .fallback(page_not_found_handler)
}

pub fn status_for_reservation_error(err: &ReservationError) -> StatusCode {
    match err {
        ReservationError::InvalidListing(_) | ReservationError::InvalidRequester(_) => {
            StatusCode::BAD_REQUEST
        }
        ReservationError::PersistenceFailure(e) => match e {
            PersistenceError::ForeignKeyViolation { .. } | PersistenceError::NotFound => {
                StatusCode::NOT_FOUND
            }
            PersistenceError::InvalidTransition { .. } => StatusCode::CONFLICT,
            PersistenceError::ConnectionLost | PersistenceError::TimedOut => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PersistenceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

pub fn status_for_confirm_error(err: &ConfirmError) -> StatusCode {
    match err {
        ConfirmError::Params(_) => StatusCode::BAD_REQUEST,
        ConfirmError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ConfirmError::Reservation(e) => status_for_reservation_error(e),
    }
}
