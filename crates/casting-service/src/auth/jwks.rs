//! Key resolution for token verification.
//!
//! The identity provider publishes its signing keys as a JSON Web Key Set at a
//! fixed URL. [`JwksClient`] fetches that document and caches the keys for the
//! process lifetime; a lookup for an unknown key id triggers a refetch, which
//! picks up key rotations. An optional TTL additionally refetches stale sets.
//!
//! Miss-triggered refetches are spaced by a minimum interval measured from the
//! last successful fetch, so a stream of tokens with made-up key ids costs at
//! most one outbound request per interval.
//!
//! # Concurrency
//!
//! - Lookups only take a read lock
//! - A refresh fetches WITHOUT holding any lock, then swaps the whole key map
//!   under a short write lock
//! - Concurrent refreshes may run redundantly; each swap installs a complete,
//!   consistent key set

use crate::errors::AuthError;
use crate::observability::metrics::record_jwks_refresh;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Default timeout for the JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum gap between refetches triggered by an unknown key id.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// JSON Web Key from the JWKS endpoint.
///
/// Only the members needed to build RSA and Ed25519 verification keys are
/// kept; unknown members (`x5c`, `x5t`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "OKP").
    pub kty: String,

    /// Key ID. Entries without one cannot be selected and are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Algorithm the key is intended for (e.g. "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Curve name for OKP keys ("Ed25519").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// OKP public key (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

impl JwksResponse {
    /// Index the set by key id, skipping entries without one.
    fn into_key_map(self) -> HashMap<String, Jwk> {
        self.keys
            .into_iter()
            .filter_map(|key| match key.kid.clone() {
                Some(kid) if !kid.is_empty() => Some((kid, key)),
                _ => {
                    tracing::debug!(target: "casting.auth.jwks", kty = %key.kty, "Skipping JWK without kid");
                    None
                }
            })
            .collect()
    }
}

/// Resolves verification key material by key id.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Return the key published under `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyResolution` if the key set is unreachable,
    /// malformed, or has no entry for `kid`.
    async fn resolve(&self, kid: &str) -> Result<Jwk, AuthError>;
}

/// Fixed, in-memory key set.
///
/// Used for offline deployments and tests where the keys are known up front.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySet {
    keys: HashMap<String, Jwk>,
}

impl StaticKeySet {
    pub fn new(jwks: JwksResponse) -> Self {
        Self {
            keys: jwks.into_key_map(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyResolver for StaticKeySet {
    async fn resolve(&self, kid: &str) -> Result<Jwk, AuthError> {
        self.keys.get(kid).cloned().ok_or_else(|| {
            tracing::debug!(target: "casting.auth.jwks", kid = %kid, "Key not found in static key set");
            AuthError::KeyResolution
        })
    }
}

/// Cached key set with its fetch time.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this set was fetched.
    fetched_at: Instant,
}

/// Remote JWKS client with a process-wide key cache.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached JWKS data.
    cache: Arc<RwLock<Option<CachedJwks>>>,

    /// Optional TTL. `None` means the set is only refetched on a key-id miss.
    cache_ttl: Option<Duration>,

    /// A key-id miss only refetches if the cached set is at least this old.
    min_refresh_interval: Duration,
}

impl JwksClient {
    /// Create a client with the default fetch timeout and no TTL.
    pub fn new(jwks_url: String) -> Self {
        Self::with_settings(jwks_url, DEFAULT_FETCH_TIMEOUT, None)
    }

    /// Create a client with an explicit fetch timeout and optional cache TTL.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the identity provider's JWKS endpoint
    /// * `fetch_timeout` - Timeout applied to each JWKS request
    /// * `cache_ttl` - Refetch the set when it is older than this
    pub fn with_settings(
        jwks_url: String,
        fetch_timeout: Duration,
        cache_ttl: Option<Duration>,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "casting.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }

    /// Override the minimum gap between miss-triggered refetches.
    ///
    /// `Duration::ZERO` refetches on every miss.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch the key set eagerly so the first request does not pay for it.
    ///
    /// Returns the number of keys cached.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyResolution` if the fetch fails.
    pub async fn prefetch(&self) -> Result<usize, AuthError> {
        self.refresh_cache().await
    }

    /// Number of keys currently cached.
    pub async fn cached_key_count(&self) -> usize {
        self.cache
            .read()
            .await
            .as_ref()
            .map_or(0, |cached| cached.keys.len())
    }

    fn is_stale(&self, cached: &CachedJwks) -> bool {
        self.cache_ttl
            .is_some_and(|ttl| cached.fetched_at.elapsed() >= ttl)
    }

    fn miss_refresh_allowed(&self, cached: &CachedJwks) -> bool {
        cached.fetched_at.elapsed() >= self.min_refresh_interval
    }

    async fn cached_key(&self, kid: &str) -> Option<Jwk> {
        let cache = self.cache.read().await;
        cache.as_ref().and_then(|cached| cached.keys.get(kid).cloned())
    }

    /// Fetch the JWKS document and swap it into the cache.
    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<usize, AuthError> {
        let start = Instant::now();
        let result = self.fetch_keys().await;
        record_jwks_refresh(
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        let keys = result?;
        let key_count = keys.len();

        // Swap the whole set; the lock is never held across the fetch
        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });

        tracing::info!(
            target: "casting.auth.jwks",
            key_count = key_count,
            "JWKS cache refreshed"
        );

        Ok(key_count)
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, Jwk>, AuthError> {
        tracing::debug!(target: "casting.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::KeyResolution
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "casting.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeyResolution);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeyResolution
        })?;

        Ok(jwks.into_key_map())
    }

    /// Clear the cache.
    #[cfg(test)]
    pub(crate) async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[async_trait]
impl KeyResolver for JwksClient {
    /// Look the key up in the cache, refetching the set on a miss or when the
    /// TTL has elapsed.
    ///
    /// A miss on a fresh set refetches at most once per minimum refresh
    /// interval; inside the interval the miss fails without any I/O.
    #[instrument(skip(self), fields(kid = %kid))]
    async fn resolve(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if !self.is_stale(cached) {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "casting.auth.jwks", kid = %kid, "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    if !self.miss_refresh_allowed(cached) {
                        tracing::debug!(
                            target: "casting.auth.jwks",
                            kid = %kid,
                            "Key not found in JWKS cache, refetch suppressed within minimum interval"
                        );
                        return Err(AuthError::KeyResolution);
                    }
                    tracing::debug!(target: "casting.auth.jwks", kid = %kid, "Key not found in JWKS cache, refreshing");
                }
            }
        }

        if let Err(err) = self.refresh_cache().await {
            // Fall back to the stale set if it still has the key
            if let Some(key) = self.cached_key(kid).await {
                tracing::warn!(target: "casting.auth.jwks", kid = %kid, "JWKS refresh failed, using stale key");
                return Ok(key);
            }
            return Err(err);
        }

        self.cached_key(kid).await.ok_or_else(|| {
            tracing::warn!(target: "casting.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
            AuthError::KeyResolution
        })
    }
}
