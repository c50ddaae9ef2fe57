//! TTL cache in front of the key set fetcher.
//!
//! Usable signing keys from every fetched set are cached by kid until their
//! TTL expires. Concurrent misses for the same kid share one fetch. A kid
//! that is not cached always causes a fetch, so keys rotated in by the
//! identity provider are picked up on first use, and the Allow/Deny outcome
//! matches the uncached [`KeySetResolver`](super::jwks::KeySetResolver).
//!
//! Locks guard map reads and writes only; none is held across the fetch.
//! Failed fetches are not cached.

use crate::auth::jwks::{
    select_from, Jwk, JwkSet, KeySetFetcher, ResolvedSigningKey, SigningKeyResolver,
};
use crate::errors::AuthError;
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::Instant;
use tracing::instrument;

type FetchResult = Result<Arc<JwkSet>, AuthError>;
type Flight = Arc<OnceCell<FetchResult>>;
type FlightMap = Mutex<HashMap<String, Flight>>;

/// Cached key with expiry time.
struct CachedKey {
    jwk: Jwk,
    expires_at: Instant,
}

/// Resolver that caches usable keys by kid.
pub struct CachingKeySetResolver {
    fetcher: Arc<dyn KeySetFetcher>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedKey>>,
    in_flight: FlightMap,
}

impl CachingKeySetResolver {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Number of unexpired cached keys.
    pub async fn cached_key_count(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Drop every cached key.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn cached(&self, kid: &str) -> Option<Jwk> {
        let entries = self.entries.read().await;
        entries
            .get(kid)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.jwk.clone())
    }

    /// Join the in-flight fetch for `kid`, or register a new one.
    ///
    /// The returned guard unregisters the flight once its last holder is
    /// gone, including holders dropped mid-fetch.
    fn join_flight<'a>(&'a self, kid: &'a str) -> FlightGuard<'a> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = in_flight.entry(kid.to_string()).or_default();
        // A finished flight still held by late readers is not joined
        if slot.initialized() {
            *slot = Arc::default();
        }

        FlightGuard {
            in_flight: &self.in_flight,
            kid,
            flight: Arc::clone(slot),
        }
    }

    async fn fetch_and_store(&self) -> FetchResult {
        let jwks = self.fetcher.fetch().await?;
        let expires_at = Instant::now() + self.ttl;

        let mut fresh: HashMap<String, CachedKey> = HashMap::new();
        for jwk in jwks.signing_keys() {
            if let Some(kid) = jwk.kid.as_ref() {
                fresh.entry(kid.clone()).or_insert_with(|| CachedKey {
                    jwk: jwk.clone(),
                    expires_at,
                });
            }
        }

        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.extend(fresh);

        tracing::info!(
            target: "authz.auth.cache",
            key_count = entries.len(),
            "Key cache refreshed"
        );

        Ok(Arc::new(jwks))
    }
}

/// One caller's share of an in-flight fetch.
struct FlightGuard<'a> {
    in_flight: &'a FlightMap,
    kid: &'a str,
    flight: Flight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Release our handle under the lock so the holder count is exact
        let ours = std::mem::take(&mut self.flight);
        let last_holder = in_flight.get(self.kid).is_some_and(|current| {
            Arc::ptr_eq(current, &ours) && Arc::strong_count(current) == 2
        });
        drop(ours);

        if last_holder {
            in_flight.remove(self.kid);
        }
    }
}

#[async_trait]
impl SigningKeyResolver for CachingKeySetResolver {
    #[instrument(skip_all, fields(kid = %kid))]
    async fn resolve(&self, kid: &str) -> Result<ResolvedSigningKey, AuthError> {
        if let Some(jwk) = self.cached(kid).await {
            tracing::debug!(target: "authz.auth.cache", "Key cache hit");
            metrics::record_jwks_cache_lookup("hit");
            return ResolvedSigningKey::from_jwk(&jwk);
        }

        tracing::debug!(target: "authz.auth.cache", "Key cache miss");
        metrics::record_jwks_cache_lookup("miss");

        let guard = self.join_flight(kid);
        let result = guard
            .flight
            .get_or_init(|| self.fetch_and_store())
            .await
            .clone();
        drop(guard);

        let jwks = result?;
        select_from(jwks.signing_keys(), kid)
    }
}
