//! HTTP adapter integration tests.
//!
//! Drives the router with `tower::ServiceExt::oneshot` against a mocked key
//! set endpoint.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use authorizer::auth::{HttpKeySetFetcher, KeySetFetcher};
use authorizer::authorizer::Authorizer;
use authorizer::config::Config;
use authorizer::routes::{build_routes, AppState};
use authorizer::shutdown::ShutdownTokens;
use authorizer_test_utils::{JwksBuilder, MockKeySet, TestTokenBuilder, PRIMARY_X5C, TEST_KID};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    shutdown: ShutdownTokens,
}

fn test_app(key_set: &MockKeySet) -> TestApp {
    let vars = HashMap::from([("JWKS_URL".to_string(), key_set.url())]);
    let config = Config::from_vars(&vars).expect("test config should be valid");

    let key_set_fetcher: Arc<dyn KeySetFetcher> = Arc::new(HttpKeySetFetcher::new(
        config.jwks_url.clone(),
        config.jwks_fetch_timeout,
    ));
    let authorizer = Arc::new(Authorizer::with_fetcher(
        Arc::clone(&key_set_fetcher),
        &config,
    ));
    let shutdown = ShutdownTokens::new();

    let state = Arc::new(AppState {
        authorizer,
        key_set_fetcher,
        shutdown: shutdown.clone(),
    });
    // Not installed globally; renders whatever is recorded through it
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

    TestApp {
        router: build_routes(state, metrics_handle),
        shutdown,
    }
}

async fn primary_key_set() -> MockKeySet {
    MockKeySet::start(JwksBuilder::new().with_certificate_key(TEST_KID, PRIMARY_X5C)).await
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.expect("request should succeed");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec();
    (status, body)
}

fn authorize_request(event: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/v1/authorize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(event.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn token_event(authorization_token: Option<&str>) -> Value {
    let mut event = json!({
        "type": "TOKEN",
        "methodArn": "arn:aws:execute-api:us-east-1:123456789012:abcdef/prod/GET/products"
    });
    if let Some(token) = authorization_token {
        event["authorizationToken"] = json!(token);
    }
    event
}

fn deny_body() -> Value {
    json!({
        "principalId": "user",
        "policyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Action": "execute-api:Invoke",
                "Effect": "Deny",
                "Resource": "*"
            }]
        }
    })
}

// ============================================================================
// /v1/authorize
// ============================================================================

#[tokio::test]
async fn test_authorize_allows_valid_token() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);
    let token = TestTokenBuilder::new().for_user("user-42").build();

    let (status, body) = send(
        app.router,
        authorize_request(&token_event(Some(&format!("Bearer {token}")))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["principalId"], "user-42");
    assert_eq!(body["policyDocument"]["Statement"][0]["Effect"], "Allow");
}

#[tokio::test]
async fn test_authorize_denials_share_one_shape() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);
    let expired = TestTokenBuilder::new().expires_in(-3600).build();
    let unknown_kid = TestTokenBuilder::new().with_kid("unknown").build();

    let events = [
        token_event(None),
        token_event(Some("")),
        token_event(Some("Basic xyz")),
        token_event(Some(&format!("Bearer {expired}"))),
        token_event(Some(&format!("Bearer {unknown_kid}"))),
    ];

    for event in &events {
        let (status, body) = send(app.router.clone(), authorize_request(event)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), deny_body());
    }
}

#[tokio::test]
async fn test_authorize_after_shutdown_denies() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);
    app.shutdown.in_flight.cancel();
    let token = TestTokenBuilder::new().build();

    let (status, body) = send(
        app.router,
        authorize_request(&token_event(Some(&format!("Bearer {token}")))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), deny_body());
}

#[tokio::test]
async fn test_authorize_rejects_invalid_event_body() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/authorize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send(app.router, request).await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_authorize_requires_post() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);

    let (status, _) = send(app.router, get("/v1/authorize")).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

// ============================================================================
// Health, readiness, metrics
// ============================================================================

#[tokio::test]
async fn test_health_returns_ok() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);

    let (status, body) = send(app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_ready_when_key_set_reachable() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);

    let (status, body) = send(app.router, get("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({"status": "ready", "jwks": "healthy"})
    );
}

#[tokio::test]
async fn test_not_ready_when_key_set_fails() {
    let key_set = MockKeySet::start_failing(503).await;
    let app = test_app(&key_set);

    let (status, body) = send(app.router, get("/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["jwks"], "unhealthy");
    assert_eq!(body["error"], "Service dependencies unavailable");
}

#[tokio::test]
async fn test_not_ready_after_shutdown() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);
    app.shutdown.in_flight.cancel();

    let (status, _) = send(app.router, get("/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(key_set.request_count().await, 0);
}

#[tokio::test]
async fn test_draining_fails_readiness_but_keeps_authorizing() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);
    app.shutdown.draining.cancel();

    let (status, body) = send(app.router.clone(), get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["error"], "Service shutting down");

    let token = TestTokenBuilder::new().for_user("user-42").build();
    let (status, body) = send(
        app.router,
        authorize_request(&token_event(Some(&format!("Bearer {token}")))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["principalId"], "user-42");
    assert_eq!(body["policyDocument"]["Statement"][0]["Effect"], "Allow");
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);

    let (status, _) = send(app.router, get("/metrics")).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let key_set = primary_key_set().await;
    let app = test_app(&key_set);

    let (status, _) = send(app.router, get("/admin")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
