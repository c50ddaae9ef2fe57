//! Authorizer HTTP models.

use serde::{Deserialize, Serialize};

/// Token authorizer event sent by the gateway.
///
/// ```json
/// { "type": "TOKEN", "authorizationToken": "Bearer ...", "methodArn": "arn:..." }
/// ```
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAuthorizerEvent {
    /// Event type (the gateway sends "TOKEN").
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,

    /// Raw `Authorization` header value, if the caller sent one.
    #[serde(default)]
    pub authorization_token: Option<String>,

    /// Invoked method. Logged for correlation only; the decision always
    /// covers every resource.
    #[serde(default)]
    pub method_arn: Option<String>,
}

/// Custom Debug implementation that redacts the bearer credential.
impl std::fmt::Debug for TokenAuthorizerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthorizerEvent")
            .field("event_type", &self.event_type)
            .field(
                "authorization_token",
                &self.authorization_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("method_arn", &self.method_arn)
            .finish()
    }
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: String,

    /// Key set endpoint status ("healthy" or "unhealthy").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
