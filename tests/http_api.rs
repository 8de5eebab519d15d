use std::sync::Arc;
use std::time::Duration;

use annonce_booking_backend::controller::{router_endpoints, AppState};
use annonce_booking_backend::repositories::memory_repo::InMemoryReservationGateway;
use annonce_booking_backend::services::reservation_service::{ReservationService, ServiceSettings};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

fn seeded() -> Arc<InMemoryReservationGateway> {
    Arc::new(
        InMemoryReservationGateway::new()
            .with_listing("42")
            .with_user("7"),
    )
}

fn app(gateway: Arc<InMemoryReservationGateway>, dedup_window: Duration) -> Router {
    let reservation_service = Arc::new(ReservationService::new(
        gateway,
        ServiceSettings {
            dedup_window,
            request_timeout: Duration::from_secs(2),
        },
    ));
    router_endpoints(AppState { reservation_service })
}

fn confirm_request(query: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(format!("/reservations{}", query));
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn confirm_creates_pending_reservation_and_navigates_back() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::ZERO);

    let response = app
        .clone()
        .oneshot(confirm_request("?id=42", Some("7")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["navigation"], "back");
    assert_eq!(body["notifications"][0]["kind"], "success");
    assert_eq!(body["reservation"]["status"], "pending");

    let id = body["reservation"]["id"].as_str().unwrap().to_string();
    let response = app
        .oneshot(get(&format!("/reservations/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["listing_id"], "42");
    assert_eq!(body["user_id"], "7");
}

#[tokio::test]
async fn confirm_failures_map_to_status_codes() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::ZERO);

    let cases = [
        (confirm_request("", Some("7")), StatusCode::BAD_REQUEST),
        (confirm_request("?id=", Some("7")), StatusCode::BAD_REQUEST),
        (confirm_request("?id=42", None), StatusCode::UNAUTHORIZED),
        (confirm_request("?id=404", Some("7")), StatusCode::NOT_FOUND),
    ];
    for (request, expected) in cases {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), expected);
        let body = body_json(response).await;
        assert_eq!(body["navigation"], "stay");
        assert_eq!(body["notifications"][0]["kind"], "error");
        assert!(body["reservation"].is_null());
    }
    assert_eq!(gateway.reservation_count().await, 0);

    gateway.set_available(false);
    let response = app
        .oneshot(confirm_request("?id=42", Some("7")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn rapid_confirmations_create_a_single_row() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::from_secs(5));

    let first = app
        .clone()
        .oneshot(confirm_request("?id=42", Some("7")))
        .await
        .unwrap();
    let second = app
        .clone()
        .oneshot(confirm_request("?id=42", Some("7")))
        .await
        .unwrap();
    let first = body_json(first).await;
    let second = body_json(second).await;

    assert_eq!(first["reservation"]["id"], second["reservation"]["id"]);
    assert_eq!(gateway.reservation_count().await, 1);
}

#[tokio::test]
async fn overlapping_confirmations_create_a_single_row() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::from_secs(5));

    let taps = (0..5).map(|_| app.clone().oneshot(confirm_request("?id=42", Some("7"))));
    let responses = futures::future::join_all(taps).await;

    for response in responses {
        assert_eq!(response.unwrap().status(), StatusCode::CREATED);
    }
    assert_eq!(gateway.reservation_count().await, 1);
}

#[tokio::test]
async fn without_a_window_every_confirmation_is_a_row() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::ZERO);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(confirm_request("?id=42", Some("7")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    assert_eq!(gateway.reservation_count().await, 2);
}

#[tokio::test]
async fn status_transitions_over_http() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::ZERO);

    let created = body_json(
        app.clone()
            .oneshot(confirm_request("?id=42", Some("7")))
            .await
            .unwrap(),
    )
    .await;
    let id = created["reservation"]["id"].as_str().unwrap().to_string();

    let put = |path: String| {
        Request::builder()
            .method(Method::PUT)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(put(format!("/reservations/{}/confirm", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "confirmed");

    let response = app
        .clone()
        .oneshot(put(format!("/reservations/{}/cancel", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(put("/reservations/unknown/cancel".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lists_reservations_of_a_user() {
    let gateway = seeded();
    gateway.add_listing("43").await;
    let app = app(gateway.clone(), Duration::ZERO);

    for listing in ["42", "43"] {
        app.clone()
            .oneshot(confirm_request(&format!("?id={}", listing), Some("7")))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get("/reservations?user_id=7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let listings: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["listing_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(listings, vec!["43", "42"]);

    let response = app.oneshot(get("/reservations?user_id=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reading_a_reservation_named_confirm_is_not_found() {
    let response = app(seeded(), Duration::ZERO)
        .oneshot(get("/reservations/confirm"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rebooking_after_cancel_inside_window_is_pending() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::from_secs(5));

    let first = body_json(
        app.clone()
            .oneshot(confirm_request("?id=42", Some("7")))
            .await
            .unwrap(),
    )
    .await;
    let first_id = first["reservation"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!("/reservations/{}/cancel", first_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(confirm_request("?id=42", Some("7")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let again = body_json(response).await;
    assert_ne!(again["reservation"]["id"], first["reservation"]["id"]);
    assert_eq!(again["reservation"]["status"], "pending");
    assert_eq!(gateway.reservation_count().await, 2);
}

#[tokio::test]
async fn conversation_redirect_resolves_once_per_request() {
    let app = app(seeded(), Duration::ZERO);

    let response = app
        .clone()
        .oneshot(get("/conversation/redirect?id=42&userId=7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/conversation/42/7"
    );

    let response = app
        .oneshot(get("/conversation/redirect?id=42"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/messages");
}

#[tokio::test]
async fn health_follows_store_availability() {
    let gateway = seeded();
    let app = app(gateway.clone(), Duration::ZERO);

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    gateway.set_available(false);
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_route_falls_back_to_404() {
    let response = app(seeded(), Duration::ZERO)
        .oneshot(get("/settings"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
