//! Bearer credential extraction from the `Authorization` header.

use crate::errors::AuthError;
use common::jwt::decode_claims_unverified;
use serde::Deserialize;

/// Scheme prefix, matched case-insensitively.
const BEARER_PREFIX: &str = "bearer ";

/// Extract the token from an `Authorization` header value.
///
/// The header must start with `Bearer ` (any case). The token is the second
/// space-delimited field; anything after it is ignored.
///
/// # Errors
///
/// - `AuthError::MissingHeader` - header absent, empty or whitespace only
/// - `AuthError::MalformedHeader` - wrong scheme, or no second field
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "authz.auth.bearer", "Missing Authorization header");
            AuthError::MissingHeader
        })?;

    let has_bearer_scheme = header
        .get(..BEARER_PREFIX.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX));
    if !has_bearer_scheme {
        tracing::debug!(
            target: "authz.auth.bearer",
            "Authorization header is not a bearer credential"
        );
        return Err(AuthError::MalformedHeader);
    }

    header
        .split(' ')
        .nth(1)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "authz.auth.bearer", "Bearer credential has no token field");
            AuthError::MalformedHeader
        })
}

#[derive(Deserialize)]
struct Subject {
    sub: String,
}

/// Read the caller id (`sub`) from a bearer header WITHOUT verifying the token.
///
/// For request handlers that run behind the authorizer, which has already
/// verified the same header. Never use this to make an access decision.
///
/// # Errors
///
/// Fails like [`extract_bearer_token`], or with `AuthError::MalformedToken`
/// when the payload cannot be decoded or carries no non-empty `sub`.
pub fn parse_user_id(header: Option<&str>) -> Result<String, AuthError> {
    let token = extract_bearer_token(header)?;
    let subject: Subject = decode_claims_unverified(token)?;

    if subject.sub.is_empty() {
        return Err(AuthError::MalformedToken("empty subject".to_string()));
    }

    Ok(subject.sub)
}
