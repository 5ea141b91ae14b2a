//! Identity provider signing-key resolver.
//!
//! Keys are fetched lazily on the first lookup and then kept for the lifetime
//! of the resolver. Keycloak rotates realm keys rarely and a fetch per request
//! would put the identity provider on the hot path of every authenticated
//! call, so the cached set is trusted until it is explicitly reloaded (or
//! the optional TTL elapses).
//!
//! Concurrency:
//! - readers go through an `RwLock` and never observe a half-written set
//! - a cache miss takes `fetch_gate`, re-checks the cache, and only then
//!   fetches; concurrent misses wait on the gate and reuse that result
//! - a lookup that queued behind a failed fetch gets that failure instead of
//!   starting another one, so no lookup waits longer than one fetch timeout
//! - a failed fetch stores no keys; the next cache miss retries
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::services::keys::jwks::{JwksDocument, KeySet, SigningKey};
use crate::services::keys::source::{KeyError, KeyFetchError, KeyResult, KeySource};

/// Keycloak's realm certs endpoint.
pub fn keycloak_certs_url(base_url: &str, realm: &str) -> String {
    format!(
        "{}/realms/{}/protocol/openid-connect/certs",
        base_url.trim_end_matches('/'),
        realm
    )
}

#[derive(Debug, Clone)]
struct CachedKeys {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct KeyResolver {
    certs_url: String,
    client: reqwest::Client,
    // None: never expires
    ttl: Option<Duration>,
    cache: RwLock<Option<CachedKeys>>,
    // Completed fetch attempts. Only changes while `fetch_gate` is held.
    attempts: AtomicU64,
    // Held for the duration of a fetch; holds the last attempt's failure.
    fetch_gate: Mutex<Option<KeyFetchError>>,
}

impl KeyResolver {
    pub fn new(certs_url: impl Into<String>, fetch_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;

        Ok(Self {
            certs_url: certs_url.into(),
            client,
            ttl: None,
            cache: RwLock::new(None),
            attempts: AtomicU64::new(0),
            fetch_gate: Mutex::new(None),
        })
    }

    /// Expire the cached key set `ttl` after it was fetched.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn certs_url(&self) -> &str {
        &self.certs_url
    }

    /// Fetch the key set unconditionally and replace the cache.
    ///
    /// On failure the previous cache (if any) is left as it was.
    pub async fn fetch_keys(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        let mut last_failure = self.fetch_gate.lock().await;
        self.fetch_and_store(&mut last_failure).await
    }

    /// Currently cached key set, if one is present and still fresh.
    pub async fn cached(&self) -> Option<Arc<KeySet>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| self.is_fresh(c))
            .map(|c| Arc::clone(&c.keys))
    }

    async fn keys(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        if let Some(keys) = self.cached().await {
            return Ok(keys);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut last_failure = self.fetch_gate.lock().await;

        // Another task may have filled the cache while we waited on the gate.
        if let Some(keys) = self.cached().await {
            return Ok(keys);
        }

        // A fetch ran while we waited and failed: share its outcome.
        if self.attempts.load(Ordering::Acquire) != seen
            && let Some(err) = last_failure.as_ref()
        {
            debug!(url = %self.certs_url, "reusing failed fetch outcome");
            return Err(err.clone());
        }

        self.fetch_and_store(&mut last_failure).await
    }

    // `last_failure` is the guarded contents of `fetch_gate`.
    async fn fetch_and_store(
        &self,
        last_failure: &mut Option<KeyFetchError>,
    ) -> Result<Arc<KeySet>, KeyFetchError> {
        let result = self.fetch_document().await;
        self.attempts.fetch_add(1, Ordering::Release);

        match result {
            Ok(doc) => {
                let keys = Arc::new(KeySet::from(doc));
                if keys.is_empty() {
                    warn!(url = %self.certs_url, "identity provider published no usable signing keys");
                }
                info!(
                    url = %self.certs_url,
                    keys = keys.len(),
                    "loaded identity provider signing keys"
                );

                let mut cache = self.cache.write().await;
                *cache = Some(CachedKeys {
                    keys: Arc::clone(&keys),
                    fetched_at: Instant::now(),
                });
                *last_failure = None;
                Ok(keys)
            }
            Err(e) => {
                error!(url = %self.certs_url, error = %e, "failed to fetch signing keys");
                *last_failure = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn fetch_document(&self) -> Result<JwksDocument, KeyFetchError> {
        debug!(url = %self.certs_url, "fetching signing keys");

        let response = self
            .client
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|source| KeyFetchError::Transport {
                url: self.certs_url.clone(),
                source: Arc::new(source),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyFetchError::Status {
                url: self.certs_url.clone(),
                status,
            });
        }

        response
            .json::<JwksDocument>()
            .await
            .map_err(|source| KeyFetchError::Parse {
                url: self.certs_url.clone(),
                source: Arc::new(source),
            })
    }

    fn is_fresh(&self, cached: &CachedKeys) -> bool {
        match self.ttl {
            Some(ttl) => cached.fetched_at.elapsed() < ttl,
            None => true,
        }
    }
}

#[async_trait]
impl KeySource for KeyResolver {
    async fn get_key(&self, kid: &str) -> KeyResult<SigningKey> {
        let keys = self.keys().await?;
        keys.get(kid)
            .cloned()
            .ok_or_else(|| KeyError::NotFound(kid.to_string()))
    }
}
