use thiserror::Error;

use crate::services::keys::{KeyError, KeyFetchError};

/// Reasons a bearer token could not be turned into verified claims.
///
/// Every variant leads to the same outcome (default tenant, request allowed);
/// they differ only in how the failure is reported.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error(transparent)]
    KeyFetch(KeyFetchError),
    #[error("no signing key matches kid {0:?}")]
    KeyNotFound(String),
    #[error("token header carries no kid")]
    MissingKeyId,
    #[error("signing key {kid:?} is not an RSA verification key (kty={kty})")]
    UnsupportedKey { kid: String, kty: String },
    #[error("invalid token: {0}")]
    TokenInvalid(#[from] jsonwebtoken::errors::Error),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AuthzError {
    /// Short, stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyFetch(_) => "key_fetch",
            Self::KeyNotFound(_) => "key_not_found",
            Self::MissingKeyId | Self::UnsupportedKey { .. } | Self::TokenInvalid(_) => {
                "token_invalid"
            }
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl From<KeyError> for AuthzError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::Fetch(e) => Self::KeyFetch(e),
            KeyError::NotFound(kid) => Self::KeyNotFound(kid),
        }
    }
}
