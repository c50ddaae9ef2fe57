//! Gateway token authorizer endpoint.

use crate::models::TokenAuthorizerEvent;
use crate::policy::AuthorizationDecision;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /v1/authorize
///
/// Answers 200 with the decision document for both Allow and Deny; the
/// gateway enforces the effect. Requests keep being served while draining;
/// authorizations still running after the shutdown grace period are
/// cancelled and denied.
#[instrument(skip_all, name = "authz.http.authorize")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Json(event): Json<TokenAuthorizerEvent>,
) -> Json<AuthorizationDecision> {
    tracing::debug!(
        target: "authz.http",
        event_type = event.event_type.as_deref().unwrap_or(""),
        method_arn = event.method_arn.as_deref().unwrap_or(""),
        "Authorization requested"
    );

    let decision = state
        .authorizer
        .authorize_with_cancellation(
            event.authorization_token.as_deref(),
            &state.shutdown.in_flight,
        )
        .await;

    Json(decision)
}
