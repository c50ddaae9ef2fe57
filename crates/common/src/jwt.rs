//! JWT utilities shared across authorizer components.
//!
//! This module provides the transport-free parts of bearer token validation:
//! - Size limits for DoS prevention
//! - Clock skew constants for `iat`/`nbf` validation
//! - Compact-serialization splitting
//! - Strict, unverified header and claims decoding
//! - Temporal claim checks (`exp`, `nbf`, `iat`)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header decoding does NOT verify the signature; the decoded `kid` is only
//!   fit for selecting a key from a trusted key set
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_header, validate_exp_at, DEFAULT_CLOCK_SKEW};
//!
//! // Read the key ID for key set lookup
//! let header = decode_header(token)?;
//!
//! // After signature verification
//! validate_exp_at(claims.exp, chrono::Utc::now().timestamp())?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// cryptographic operations.
///
/// - Typical RS256 access tokens are 700-1500 bytes
/// - 8KB leaves room for large custom claim sets
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Applied to `iat` and `nbf`. Never applied to `exp`: a token is expired at
/// the exact second its `exp` is reached.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Guards against configuration that would weaken `iat`/`nbf` validation.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural or temporal JWT validation.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,

    /// Token `nbf` claim is still in the future.
    #[error("The access token is invalid or expired")]
    NotYetValid,

    /// Token `exp` claim has been reached.
    #[error("The access token is invalid or expired")]
    Expired,
}

// =============================================================================
// Token Structure
// =============================================================================

/// The three base64url segments of a compact-serialized token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSegments<'a> {
    /// Encoded JOSE header.
    pub header: &'a str,
    /// Encoded claims set.
    pub payload: &'a str,
    /// Encoded signature.
    pub signature: &'a str,
}

/// Decoded JOSE header of a token.
///
/// Only the registered parameters a signed access token is expected to carry
/// are accepted; any other parameter (`jku`, `jwk`, `crit`, ...) rejects the
/// token as malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signing algorithm requested by the token (not trusted).
    pub alg: String,
    /// Key identifier, guaranteed non-empty.
    pub kid: String,
    /// Media type of the complete token, usually `"JWT"`.
    pub typ: Option<String>,
    /// Content type of the payload.
    pub cty: Option<String>,
    /// Certificate SHA-1 thumbprint.
    pub x5t: Option<String>,
    /// Certificate SHA-256 thumbprint.
    pub x5t_s256: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    typ: Option<String>,
    #[serde(default)]
    cty: Option<String>,
    #[serde(default)]
    x5t: Option<String>,
    #[serde(default, rename = "x5t#S256")]
    x5t_s256: Option<String>,
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact-serialized token into its three segments.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Token does not have exactly three non-empty segments
pub fn split_token(token: &str) -> Result<TokenSegments<'_>, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok(TokenSegments {
                header,
                payload,
                signature,
            })
        }
        _ => {
            tracing::debug!(
                target: "common.jwt",
                parts = token.split('.').count(),
                "Token rejected: invalid JWT format"
            );
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Decode the JOSE header of a token without verifying the signature.
///
/// This is used to look up the correct signing key for verification when
/// multiple keys may be published (e.g., during key rotation).
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The token MUST still be verified after fetching the key
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds size limit
/// - `MalformedToken` - Wrong structure, bad base64, invalid JSON, unknown
///   header parameter, or a parameter of the wrong type
/// - `MissingKid` - Header has no `kid`, or `kid` is null or empty
pub fn decode_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    let segments = split_token(token)?;

    let header_bytes = URL_SAFE_NO_PAD.decode(segments.header).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let raw: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    // Reject empty kid values as well as missing ones
    let kid = raw
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(TokenHeader {
        alg: raw.alg,
        kid,
        typ: raw.typ,
        cty: raw.cty,
        x5t: raw.x5t,
        x5t_s256: raw.x5t_s256,
    })
}

/// Decode the claims segment of a token WITHOUT verifying the signature.
///
/// Only use this behind a component that has already verified the token.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds size limit
/// - `MalformedToken` - Wrong structure, bad base64, or claims that do not
///   match `T`
pub fn decode_claims_unverified<T: DeserializeOwned>(token: &str) -> Result<T, JwtValidationError> {
    let segments = split_token(token)?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(segments.payload).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtValidationError::MalformedToken
    })?;

    serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT payload JSON");
        JwtValidationError::MalformedToken
    })
}

/// Validate the `exp` claim against an explicit `now` timestamp.
///
/// A token is expired once `now` reaches `exp`; no clock skew applies.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` if `now >= exp`.
pub fn validate_exp_at(exp: i64, now: i64) -> Result<(), JwtValidationError> {
    if now >= exp {
        tracing::debug!(
            target: "common.jwt",
            exp = exp,
            now = now,
            "Token rejected: expired"
        );
        return Err(JwtValidationError::Expired);
    }

    Ok(())
}

/// Validate the `nbf` (not-before) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::NotYetValid` if `nbf` is more than
/// `clock_skew` after `now`.
pub fn validate_nbf_at(nbf: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    let earliest = now.saturating_add(skew_seconds(clock_skew));

    if nbf > earliest {
        tracing::debug!(
            target: "common.jwt",
            nbf = nbf,
            now = now,
            "Token rejected: not yet valid"
        );
        return Err(JwtValidationError::NotYetValid);
    }

    Ok(())
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens with `iat` too far in the future, which could indicate
/// token pre-generation, clock synchronization issues or manipulation.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// Prefer [`validate_iat`] when the wall clock is the reference. This variant
/// lets callers that already sampled `now` validate all temporal claims
/// against the same instant.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + clock_skew`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    let clock_skew_secs = skew_seconds(clock_skew);
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

fn skew_seconds(clock_skew: Duration) -> i64 {
    i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX)
}

// =============================================================================
// Tests
// =============================================================================
