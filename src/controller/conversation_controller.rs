use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use tracing::debug;
use crate::helpers::route_params::RouteParams;
use crate::presentation::conversation_redirect::ConversationRedirect;

pub fn router() -> Router {
    Router::new().route("/redirect", get(redirect_to_conversation))
}

/// Each request is one mount of the redirect screen.
pub async fn redirect_to_conversation(
    Query(params): Query<RouteParams>,
) -> impl IntoResponse {
    let mut redirect = ConversationRedirect::new();

    match redirect.on_mount(&params) {
        Some(target) => {
            let path = target.path();
            debug!("Redirecting conversation screen to {}", path);
            Redirect::to(&path).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
