//! Authorizer error types.
//!
//! Every variant is collapsed into the same generic Deny decision at the
//! authorization boundary. The detail strings exist for server-side
//! diagnostics only and must never contain token material.

use common::jwt::JwtValidationError;
use thiserror::Error;

/// Reasons a bearer token can fail authorization.
///
/// `Clone` so that a single in-flight key set fetch can hand the same
/// failure to every request waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Authorization header is not a bearer credential")]
    MalformedHeader,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Key set fetch failed: {0}")]
    KeySetFetch(String),

    #[error("No signing key for kid '{0}'")]
    KeyNotFound(String),

    #[error("Invalid certificate encoding: {0}")]
    InvalidCertificateEncoding(String),

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid claims: {0}")]
    InvalidClaims(String),
}

impl AuthError {
    /// Bounded label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::KeySetFetch(_) => "key_set_fetch",
            AuthError::KeyNotFound(_) => "key_not_found",
            AuthError::InvalidCertificateEncoding(_) => "invalid_certificate_encoding",
            AuthError::SignatureInvalid(_) => "signature_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims(_) => "invalid_claims",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => {
                AuthError::MalformedToken("token exceeds size limit".to_string())
            }
            JwtValidationError::MalformedToken => {
                AuthError::MalformedToken("invalid token structure".to_string())
            }
            JwtValidationError::MissingKid => {
                AuthError::MalformedToken("header has no usable kid".to_string())
            }
            JwtValidationError::Expired => AuthError::TokenExpired,
            JwtValidationError::NotYetValid => {
                AuthError::InvalidClaims("token not yet valid".to_string())
            }
            JwtValidationError::IatTooFarInFuture => {
                AuthError::InvalidClaims("iat too far in the future".to_string())
            }
        }
    }
}
