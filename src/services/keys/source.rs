//! Key lookup interface used by the decision engine.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::services::keys::jwks::SigningKey;

pub type KeyResult<T> = Result<T, KeyError>;

/// Key lookup errors.
///
/// The engine treats every variant the same way (fail open to the default
/// tenant); the split only exists so logs can tell an unreachable identity
/// provider apart from a token signed by an unknown key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to fetch signing keys: {0}")]
    Fetch(#[from] KeyFetchError),
    #[error("signing key not found: {0}")]
    NotFound(String),
}

/// A failed key set fetch.
///
/// Cloneable so every lookup that queued behind one fetch gets its outcome.
#[derive(Debug, Clone, Error)]
pub enum KeyFetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("malformed key set from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },
}

/// Resolves a signing key by key-id.
///
/// Implementations must be shareable across request tasks.
#[async_trait]
pub trait KeySource: Send + Sync + 'static {
    async fn get_key(&self, kid: &str) -> KeyResult<SigningKey>;
}
