//! Key set retrieval and signing key resolution.
//!
//! The key set is fetched from the identity provider's JWKS endpoint and
//! filtered down to RSA signing keys. A key is selected by the `kid` from the
//! token header; its public key comes from the first certificate of its `x5c`
//! chain, or from its RSA modulus and exponent when no certificate is
//! published.
//!
//! # Security
//!
//! - Every fetch is bounded by a timeout so an unreachable endpoint cannot
//!   stall authorization
//! - Fetch failures are never treated as an empty key set; they deny
//! - HTTPS should be used in production (enforced by deployment config)

use crate::auth::pem::certificate_to_pem;
use crate::errors::AuthError;
use crate::observability::metrics;
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default bound on a key set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

const SIGNING_USE: &str = "sig";
const RSA_KEY_TYPE: &str = "RSA";

/// JSON Web Key from the key set endpoint.
///
/// All fields are optional so that an entry using parameters this service
/// does not understand is filtered out instead of failing the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Key type (must be "RSA").
    #[serde(default)]
    pub kty: Option<String>,

    /// Key use (must be "sig").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Algorithm hint. Not trusted; verification is always RS256.
    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Certificate chain, standard base64 DER, leaf first.
    #[serde(default)]
    pub x5c: Option<Vec<String>>,

    /// Not-before timestamp published with the key, if any.
    #[serde(default)]
    pub nbf: Option<i64>,
}

impl Jwk {
    /// Whether this entry can be used to verify RS256 signatures.
    ///
    /// Requires `use == "sig"`, `kty == "RSA"`, a non-empty `kid`, and either
    /// at least one certificate or a non-empty modulus/exponent pair.
    pub fn is_usable_signing_key(&self) -> bool {
        let is_signing = self.key_use.as_deref() == Some(SIGNING_USE);
        let is_rsa = self.kty.as_deref() == Some(RSA_KEY_TYPE);
        let has_kid = self.kid.as_deref().is_some_and(|kid| !kid.is_empty());

        is_signing && is_rsa && has_kid && (self.has_certificate() || self.has_rsa_components())
    }

    fn has_certificate(&self) -> bool {
        self.x5c.as_ref().is_some_and(|chain| !chain.is_empty())
    }

    fn has_rsa_components(&self) -> bool {
        let non_empty = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        non_empty(&self.n) && non_empty(&self.e)
    }
}

#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<serde_json::Value>,
}

/// JWKS document `{ "keys": [ ... ] }`.
///
/// The document must be an object with a `keys` array. Entries that are not
/// JSON objects of the expected shape are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawJwkSet")]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl From<RawJwkSet> for JwkSet {
    fn from(raw: RawJwkSet) -> Self {
        let keys = raw
            .keys
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Jwk>(value) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    tracing::debug!(
                        target: "authz.auth.jwks",
                        error = %e,
                        "Skipping undecodable key set entry"
                    );
                    None
                }
            })
            .collect();

        Self { keys }
    }
}

impl JwkSet {
    /// Entries that pass the signing key filter, in document order.
    pub fn signing_keys(&self) -> impl Iterator<Item = &Jwk> {
        self.keys.iter().filter(|jwk| jwk.is_usable_signing_key())
    }
}

/// Public key material of a resolved key.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// PEM `CERTIFICATE` block built from `x5c[0]`.
    CertificatePem(String),
    /// Base64url RSA modulus and exponent.
    RsaComponents { n: String, e: String },
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::CertificatePem(pem) => f
                .debug_tuple("CertificatePem")
                .field(&format_args!("{} bytes", pem.len()))
                .finish(),
            KeyMaterial::RsaComponents { n, .. } => f
                .debug_struct("RsaComponents")
                .field("n", &format_args!("{} chars", n.len()))
                .finish_non_exhaustive(),
        }
    }
}

/// The key chosen to verify one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSigningKey {
    pub kid: String,
    /// Carried from the key set entry; informational only.
    pub not_before: Option<i64>,
    pub material: KeyMaterial,
}

impl ResolvedSigningKey {
    /// Derive the signing key from a usable key set entry.
    ///
    /// Only the first certificate of the chain is used. The RSA components
    /// are used only when the entry publishes no certificate.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCertificateEncoding` - `x5c[0]` is not valid base64
    /// - `AuthError::KeyNotFound` - the entry has no kid or no key material
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, AuthError> {
        let kid = jwk
            .kid
            .clone()
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::KeyNotFound(String::new()))?;

        let material = match jwk.x5c.as_ref().and_then(|chain| chain.first()) {
            Some(certificate) => KeyMaterial::CertificatePem(certificate_to_pem(certificate)?),
            None => match (jwk.n.as_deref(), jwk.e.as_deref()) {
                (Some(n), Some(e)) if !n.is_empty() && !e.is_empty() => KeyMaterial::RsaComponents {
                    n: n.to_string(),
                    e: e.to_string(),
                },
                _ => return Err(AuthError::KeyNotFound(kid)),
            },
        };

        Ok(Self {
            kid,
            not_before: jwk.nbf,
            material,
        })
    }

    /// Build the `jsonwebtoken` decoding key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCertificateEncoding` if the certificate or
    /// the RSA components cannot be parsed into a public key.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        let key = match &self.material {
            KeyMaterial::CertificatePem(pem) => DecodingKey::from_rsa_pem(pem.as_bytes()),
            KeyMaterial::RsaComponents { n, e } => DecodingKey::from_rsa_components(n, e),
        };

        key.map_err(|e| {
            tracing::debug!(
                target: "authz.auth.jwks",
                kid = %self.kid,
                error = %e,
                "Key material is not a usable RSA public key"
            );
            AuthError::InvalidCertificateEncoding(format!(
                "unusable public key for kid '{}'",
                self.kid
            ))
        })
    }
}

/// Fetches the published key set.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetch the current key set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetFetch` on any transport, status or decoding
    /// failure.
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Resolves a `kid` to a signing key.
#[async_trait]
pub trait SigningKeyResolver: Send + Sync {
    /// Resolve the signing key for `kid`.
    ///
    /// # Errors
    ///
    /// - `AuthError::KeySetFetch` - the key set could not be fetched
    /// - `AuthError::KeyNotFound` - no usable key has this kid
    /// - `AuthError::InvalidCertificateEncoding` - the key's certificate is malformed
    async fn resolve(&self, kid: &str) -> Result<ResolvedSigningKey, AuthError>;
}

/// HTTP key set fetcher.
pub struct HttpKeySetFetcher {
    jwks_url: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpKeySetFetcher {
    /// Create a fetcher for `jwks_url` with every request bounded by `timeout`.
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(
                    target: "authz.auth.jwks",
                    error = %e,
                    "Failed to build HTTP client with custom config, using defaults"
                );
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            timeout,
        }
    }

    async fn fetch_once(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "transport error" };
                tracing::error!(target: "authz.auth.jwks", error = %e, "Failed to fetch key set");
                AuthError::KeySetFetch(reason.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "authz.auth.jwks",
                status = %status,
                "Key set endpoint returned error"
            );
            return Err(AuthError::KeySetFetch(format!("status {}", status.as_u16())));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!(
                target: "authz.auth.jwks",
                error = %e,
                "Failed to parse key set response"
            );
            AuthError::KeySetFetch("undecodable key set".to_string())
        })
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    #[instrument(skip_all)]
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let start = Instant::now();
        let result = self.fetch_once().await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_jwks_fetch(status, start.elapsed());

        if let Ok(jwks) = &result {
            tracing::debug!(
                target: "authz.auth.jwks",
                key_count = jwks.keys.len(),
                "Fetched key set"
            );
        }
        result
    }
}

/// Uncached resolver: every call fetches the key set once.
pub struct KeySetResolver {
    fetcher: Arc<dyn KeySetFetcher>,
}

impl KeySetResolver {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self { fetcher }
    }

    /// Select the usable key for `kid` from a fetched set.
    ///
    /// The first matching entry wins when a kid is published more than once.
    ///
    /// # Errors
    ///
    /// `AuthError::KeyNotFound` if no usable entry matches, or any error of
    /// [`ResolvedSigningKey::from_jwk`].
    pub fn select(jwks: &JwkSet, kid: &str) -> Result<ResolvedSigningKey, AuthError> {
        select_from(jwks.signing_keys(), kid)
    }
}

/// Pick the first key whose kid equals `kid`.
pub(crate) fn select_from<'a>(
    keys: impl IntoIterator<Item = &'a Jwk>,
    kid: &str,
) -> Result<ResolvedSigningKey, AuthError> {
    let jwk = keys
        .into_iter()
        .find(|jwk| jwk.kid.as_deref() == Some(kid))
        .ok_or_else(|| {
            tracing::debug!(target: "authz.auth.jwks", kid = %kid, "Key not found in key set");
            AuthError::KeyNotFound(kid.to_string())
        })?;

    ResolvedSigningKey::from_jwk(jwk)
}

#[async_trait]
impl SigningKeyResolver for KeySetResolver {
    #[instrument(skip_all, fields(kid = %kid))]
    async fn resolve(&self, kid: &str) -> Result<ResolvedSigningKey, AuthError> {
        let jwks = self.fetcher.fetch().await?;
        Self::select(&jwks, kid)
    }
}
