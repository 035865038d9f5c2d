//! Integration tests for the Sizewatch bot ingress.
//!
//! Exercises the HTTP endpoints against the real router.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use sizewatch_bot::{build_router, create_state, TelegramChannel};
use std::sync::Arc;
use tower::ServiceExt;

/// Test helper to create a router without a Telegram channel.
fn create_test_app() -> axum::Router {
    build_router(create_state(None))
}

/// Test helper to create a router with a (non-functional) Telegram channel.
fn create_test_app_with_telegram() -> axum::Router {
    let telegram = Arc::new(TelegramChannel::new("test-token".into(), 1));
    build_router(create_state(Some(telegram)))
}

/// Helper to make a JSON request.
async fn request_json(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = if let Some(b) = body {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap()
    } else {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (status, json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Health Check Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let (status, json) = request_json(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "sizewatch-bot");
}

#[tokio::test]
async fn test_ready_without_telegram() {
    let app = create_test_app();

    let (status, json) = request_json(&app, Method::GET, "/ready", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "not_ready");
}

#[tokio::test]
async fn test_ready_with_telegram() {
    let app = create_test_app_with_telegram();

    let (status, json) = request_json(&app, Method::GET, "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
}

// ─────────────────────────────────────────────────────────────────────────────
// Event Ingress Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_event_acknowledges_without_telegram() {
    // Delivery is fire-and-forget: the acknowledgment is fixed even when
    // no channel is configured
    let app = create_test_app();

    let payload = json!({
        "userId": 123456789i64,
        "message": "Back in stock!"
    });

    let (status, json) = request_json(&app, Method::POST, "/event", Some(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Message sent");
}

#[tokio::test]
async fn test_event_acknowledges_with_telegram() {
    // The send happens in a background task against an unreachable token;
    // the acknowledgment must not wait for it
    let app = create_test_app_with_telegram();

    let payload = json!({
        "userId": 123456789i64,
        "message": "Price dropped"
    });

    let (status, json) = request_json(&app, Method::POST, "/event", Some(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_event_rejects_invalid_json() {
    let app = create_test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/event")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not valid json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_rejects_missing_fields() {
    let app = create_test_app();

    let (status, _) = request_json(
        &app,
        Method::POST,
        "/event",
        Some(json!({ "message": "no user id" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_test_app();

    let (status, _) = request_json(&app, Method::GET, "/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
