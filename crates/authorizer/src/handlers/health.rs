//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks the key set endpoint

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Fetches the key set through the same fetcher the authorizer uses.
/// Returns 200 if ready, 503 if the key set is unavailable or shutdown has
/// begun (including the drain period).
///
/// ## Security
///
/// Error messages are intentionally generic. Actual errors are logged
/// server-side.
#[tracing::instrument(skip_all, name = "authz.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.shutdown.is_shutting_down() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                jwks: None,
                error: Some("Service shutting down".to_string()),
            }),
        );
    }

    match state.key_set_fetcher.fetch().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                jwks: Some("healthy".to_string()),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(
                target: "authz.http",
                reason = e.kind(),
                "Readiness check failed: key set unavailable"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".to_string(),
                    jwks: Some("unhealthy".to_string()),
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
