//! HTTP API tests through the full router

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use stock_ledger_backend::{create_app, middleware::Claims, AppState};
use tower::ServiceExt;

use common::{harness, SECRET};

fn app() -> Router {
    let h = harness();
    create_app(AppState::new(h.services, h.config, None))
}

fn token(user: &str, permissions: &[&str]) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "in_memory");
    assert_eq!(body["store_reachable"], true);
    assert_eq!(body["strict_allocation"], false);
}

#[tokio::test]
async fn test_health_reports_strict_mode_and_feed_subscribers() {
    let mut config = stock_ledger_backend::config::Config::in_memory(SECRET);
    config.transfer.reject_partial_allocation = true;
    let h = common::harness_with(config, stock_ledger_backend::store::MemoryStore::new());
    let _watcher = h.services.feed.subscribe();
    let app = create_app(AppState::new(h.services, h.config, None));

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strict_allocation"], true);
    assert_eq!(body["feed_subscribers"], 1);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/inventory/summary", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_missing_permission_is_forbidden() {
    let app = app();
    let t = token("alice", &["inventory:read"]);
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/inventory/counts",
        Some(&t),
        Some(json!({"sku": "A001", "amount": "5", "location": "logistics"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

// ============================================================================
// End-to-end flow
// ============================================================================

#[tokio::test]
async fn test_count_transfer_confirm_flow() {
    let app = app();
    let t = token("alice", &["inventory:*", "transactions:*"]);

    let (status, entry) = send(
        &app,
        "POST",
        "/api/v1/inventory/counts",
        Some(&t),
        Some(json!({"sku": "A001", "amount": "100", "location": "logistics", "item_name": "Bolt"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["counted_by"], "alice");

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(&t),
        Some(json!({
            "sku": "A001",
            "amount": "10",
            "from_location": "logistics",
            "to_location": "production_zone_2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["transaction"]["id"].as_str().unwrap().to_string();
    let otp = created["otp"].as_str().unwrap().to_string();
    assert_eq!(created["transaction"]["status"], "pending");

    let (status, confirmed) = send(
        &app,
        "POST",
        &format!("/api/v1/transactions/{}/confirm", id),
        Some(&t),
        Some(json!({ "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["transaction"]["status"], "completed");
    assert_eq!(confirmed["outcome"]["lines"][0]["status"], "applied");

    let (status, summary) = send(&app, "GET", "/api/v1/inventory/summary", Some(&t), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["zones"], json!([2]));
    assert_eq!(summary["rows"][0]["sku"], "A001");

    let (status, again) = send(
        &app,
        "POST",
        &format!("/api/v1/transactions/{}/confirm", id),
        Some(&t),
        Some(json!({ "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(again["error"]["code"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn test_validation_error_shape() {
    let app = app();
    let t = token("alice", &["transactions:create"]);
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(&t),
        Some(json!({
            "sku": "A001",
            "amount": "-1",
            "from_location": "logistics",
            "to_location": "production_zone_2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "amount");
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() {
    let app = app();
    let t = token("alice", &["transactions:read"]);
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/transactions/{}", uuid::Uuid::new_v4()),
        Some(&t),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// ============================================================================
// Change feed
// ============================================================================

#[tokio::test]
async fn test_events_stream_opens() {
    let app = app();
    let t = token("alice", &["events:read"]);
    let request = Request::builder()
        .uri("/api/v1/events?sku=a001")
        .header(header::AUTHORIZATION, format!("Bearer {}", t))
        .body(Body::empty())
        .unwrap();

    // Only the head is inspected; the body stays open until the client leaves
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_events_require_permission() {
    let app = app();
    let t = token("alice", &["inventory:read"]);
    let (status, _) = send(&app, "GET", "/api/v1/events", Some(&t), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
