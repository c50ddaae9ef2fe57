//! Authorization decision builder.
//!
//! Drives one request through the pipeline:
//!
//! ```text
//! Start --extract--> TokenExtracted --verify--> ClaimsVerified --> Allow
//!   |                     |
//!   +---------------------+--> Deny
//! ```
//!
//! Every failure collapses into the same Deny decision. The failing stage and
//! error kind are logged and counted, never returned.

use crate::auth::{
    extract_bearer_token, CachingKeySetResolver, Claims, HttpKeySetFetcher, JwtVerifier,
    KeySetFetcher, KeySetResolver, SigningKeyResolver, VerificationOptions,
};
use crate::config::Config;
use crate::errors::AuthError;
use crate::observability::metrics;
use crate::policy::AuthorizationDecision;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Pipeline state a request failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Header received, no token extracted yet.
    Start,
    /// Token extracted, verification (including key resolution) pending.
    TokenExtracted,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::TokenExtracted => "token_extracted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was denied. Internal diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub stage: Stage,
    pub error: AuthError,
}

impl Rejection {
    fn at(stage: Stage) -> impl FnOnce(AuthError) -> Self {
        move |error| Self { stage, error }
    }
}

/// Bearer token authorizer.
pub struct Authorizer {
    verifier: JwtVerifier,
}

impl Authorizer {
    pub fn new(verifier: JwtVerifier) -> Self {
        Self { verifier }
    }

    /// Build the production pipeline over HTTP key set fetching.
    pub fn from_config(config: &Config) -> Self {
        let fetcher = Arc::new(HttpKeySetFetcher::new(
            config.jwks_url.clone(),
            config.jwks_fetch_timeout,
        ));
        Self::with_fetcher(fetcher, config)
    }

    /// Build the pipeline over an existing fetcher.
    ///
    /// Keys are cached when `config.jwks_cache_ttl` is set; otherwise every
    /// authorization fetches the key set.
    pub fn with_fetcher(fetcher: Arc<dyn KeySetFetcher>, config: &Config) -> Self {
        let resolver: Arc<dyn SigningKeyResolver> = match config.jwks_cache_ttl {
            Some(ttl) => {
                tracing::info!(
                    target: "authz.policy",
                    ttl_seconds = ttl.as_secs(),
                    "Signing key cache enabled"
                );
                Arc::new(CachingKeySetResolver::new(fetcher, ttl))
            }
            None => Arc::new(KeySetResolver::new(fetcher)),
        };

        Self::new(JwtVerifier::new(
            resolver,
            VerificationOptions::from_config(config),
        ))
    }

    /// Decide on a raw `Authorization` header value.
    ///
    /// Never fails: any error yields the generic Deny.
    #[instrument(skip_all)]
    pub async fn authorize(&self, header: Option<&str>) -> AuthorizationDecision {
        let outcome = self.evaluate(header).await;
        decide(outcome)
    }

    /// [`authorize`](Self::authorize), abandoning in-flight work once `cancel`
    /// fires. A cancelled request is denied as a key set fetch failure.
    #[instrument(skip_all)]
    pub async fn authorize_with_cancellation(
        &self,
        header: Option<&str>,
        cancel: &CancellationToken,
    ) -> AuthorizationDecision {
        if cancel.is_cancelled() {
            return decide(Err(Rejection {
                stage: Stage::Start,
                error: cancelled(),
            }));
        }

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Rejection {
                stage: Stage::TokenExtracted,
                error: cancelled(),
            }),
            outcome = self.evaluate(header) => outcome,
        };
        decide(outcome)
    }

    /// Run the pipeline and report the verified claims or the rejection.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] naming the stage that failed.
    pub async fn evaluate(&self, header: Option<&str>) -> Result<Claims, Rejection> {
        let token = extract_bearer_token(header).map_err(Rejection::at(Stage::Start))?;

        self.verifier
            .verify(token)
            .await
            .map_err(Rejection::at(Stage::TokenExtracted))
    }
}

fn cancelled() -> AuthError {
    AuthError::KeySetFetch("cancelled".to_string())
}

fn decide(outcome: Result<Claims, Rejection>) -> AuthorizationDecision {
    match outcome {
        Ok(claims) => {
            tracing::debug!(target: "authz.policy", "Authorization allowed");
            metrics::record_decision("allow", "none");
            AuthorizationDecision::allow(&claims.sub)
        }
        Err(rejection) => {
            tracing::warn!(
                target: "authz.policy",
                stage = %rejection.stage,
                reason = rejection.error.kind(),
                "Authorization denied"
            );
            metrics::record_decision("deny", rejection.error.kind());
            AuthorizationDecision::deny()
        }
    }
}
