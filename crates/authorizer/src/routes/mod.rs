//! HTTP routes for the authorizer.
//!
//! Defines the Axum router and application state.

use crate::auth::KeySetFetcher;
use crate::authorizer::Authorizer;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::shutdown::ShutdownTokens;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The authorization pipeline.
    pub authorizer: Arc<Authorizer>,

    /// Key set fetcher, shared with the authorizer, for readiness probes.
    pub key_set_fetcher: Arc<dyn KeySetFetcher>,

    /// Drain and in-flight cancellation signals.
    pub shutdown: ShutdownTokens,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/authorize` - Gateway token authorizer endpoint
/// - `/health` - Liveness probe (simple "OK")
/// - `/ready` - Readiness probe (checks the key set endpoint)
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/v1/authorize", post(handlers::authorize))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
