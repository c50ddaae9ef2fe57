//! RS256 token verification.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted; the header `alg` is checked before any key lookup
//!   and `jsonwebtoken` is restricted to RS256 as well
//! - Signature is verified before any claim is trusted
//! - `exp` has no leeway; `nbf` and `iat` tolerate the configured clock skew

use crate::auth::claims::Claims;
use crate::auth::jwks::SigningKeyResolver;
use crate::config::Config;
use crate::errors::AuthError;
use common::jwt::{
    decode_header, validate_exp_at, validate_iat_at, validate_nbf_at, DEFAULT_CLOCK_SKEW,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The only accepted `alg`.
pub const ACCEPTED_ALGORITHM: &str = "RS256";

/// Claim checks beyond the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOptions {
    /// Tolerance for `nbf` and `iat` in the future.
    pub clock_skew: Duration,
    /// Required `iss`, if any.
    pub issuer: Option<String>,
    /// Required `aud` member, if any.
    pub audience: Option<String>,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            clock_skew: DEFAULT_CLOCK_SKEW,
            issuer: None,
            audience: None,
        }
    }
}

impl VerificationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            clock_skew: config.jwt_clock_skew,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }
}

/// Verifies bearer tokens against keys from the injected resolver.
pub struct JwtVerifier {
    resolver: Arc<dyn SigningKeyResolver>,
    options: VerificationOptions,
}

impl JwtVerifier {
    pub fn new(resolver: Arc<dyn SigningKeyResolver>, options: VerificationOptions) -> Self {
        Self { resolver, options }
    }

    /// Verify a token and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check and strict header decoding (`alg` and `kid` required)
    /// 2. Header `alg` must be RS256
    /// 3. Resolve the signing key for the header `kid`
    /// 4. Verify the RS256 signature
    /// 5. Validate `exp`, `nbf`, `iat`, and the optional issuer and audience
    ///
    /// # Errors
    ///
    /// - `AuthError::MalformedToken` - bad structure, header or claims encoding
    /// - `AuthError::SignatureInvalid` - non-RS256 `alg` or a bad signature
    /// - `AuthError::TokenExpired` - `now >= exp`
    /// - `AuthError::InvalidClaims` - `nbf`/`iat` too far ahead, empty `sub`,
    ///   issuer or audience mismatch
    /// - any resolver error, unchanged
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)?;

        if header.alg != ACCEPTED_ALGORITHM {
            tracing::warn!(
                target: "authz.auth.jwt",
                alg = %header.alg,
                "Rejected token with unsupported algorithm"
            );
            return Err(AuthError::SignatureInvalid(format!(
                "algorithm '{}' is not accepted",
                header.alg
            )));
        }

        let key = self.resolver.resolve(&header.kid).await?;
        let decoding_key = key.decoding_key()?;

        let claims = verify_signature(token, &decoding_key)?;
        validate_claims_at(&claims, &self.options, chrono::Utc::now().timestamp())?;

        tracing::debug!(target: "authz.auth.jwt", kid = %header.kid, "Token verified");
        Ok(claims)
    }
}

/// Verify the RS256 signature and decode the claims.
fn verify_signature(token: &str, decoding_key: &DecodingKey) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    // nbf uses the configured skew, aud and iss are optional config
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(token, decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "authz.auth.jwt", error = %e, "Token verification failed");
            map_verification_error(e.kind())
        })
}

fn map_verification_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => {
            AuthError::SignatureInvalid("signature does not match".to_string())
        }
        ErrorKind::InvalidAlgorithm => {
            AuthError::SignatureInvalid("algorithm mismatch".to_string())
        }
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => {
            AuthError::MalformedToken("undecodable token".to_string())
        }
        _ => AuthError::SignatureInvalid("verification failed".to_string()),
    }
}

/// Validate verified claims against `now` (Unix seconds).
///
/// # Errors
///
/// See [`JwtVerifier::verify`].
pub fn validate_claims_at(
    claims: &Claims,
    options: &VerificationOptions,
    now: i64,
) -> Result<(), AuthError> {
    validate_exp_at(claims.exp, now)?;

    if let Some(nbf) = claims.nbf {
        validate_nbf_at(nbf, options.clock_skew, now)?;
    }
    if let Some(iat) = claims.iat {
        validate_iat_at(iat, options.clock_skew, now)?;
    }

    if claims.sub.is_empty() {
        return Err(AuthError::InvalidClaims("empty subject".to_string()));
    }

    if let Some(expected) = options.issuer.as_deref() {
        if claims.iss.as_deref() != Some(expected) {
            tracing::debug!(target: "authz.auth.jwt", "Token issuer mismatch");
            return Err(AuthError::InvalidClaims("issuer mismatch".to_string()));
        }
    }

    if let Some(expected) = options.audience.as_deref() {
        if !claims.aud.as_ref().is_some_and(|aud| aud.contains(expected)) {
            tracing::debug!(target: "authz.auth.jwt", "Token audience mismatch");
            return Err(AuthError::InvalidClaims("audience mismatch".to_string()));
        }
    }

    Ok(())
}
