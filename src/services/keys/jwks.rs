//! JWKS document types published by the identity provider.
//!
//! Keycloak publishes every realm key on the certs endpoint, including
//! encryption keys and (depending on realm settings) EC keys. We keep the
//! descriptor permissive and let signature verification reject keys that
//! cannot be used as RS256 verification keys.
use std::collections::HashMap;

use serde::Deserialize;

/// A single JSON Web Key descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigningKey {
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    // RSA modulus (base64url)
    #[serde(default)]
    pub n: Option<String>,
    // RSA exponent (base64url)
    #[serde(default)]
    pub e: Option<String>,
}

/// Raw certs endpoint payload: `{"keys": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<SigningKey>,
}

/// Signing keys indexed by key-id.
///
/// At most one entry per key-id. When the document repeats a key-id the first
/// descriptor wins, which is the one a linear scan of the document would pick.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, SigningKey>,
}

impl KeySet {
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<JwksDocument> for KeySet {
    fn from(doc: JwksDocument) -> Self {
        let mut keys = HashMap::with_capacity(doc.keys.len());
        for key in doc.keys {
            // A key without kid can never be selected by a token header.
            let Some(kid) = key.kid.clone() else {
                tracing::debug!(kty = %key.kty, "skipping jwk without kid");
                continue;
            };
            keys.entry(kid).or_insert(key);
        }
        Self { keys }
    }
}

impl FromIterator<SigningKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = SigningKey>>(iter: I) -> Self {
        JwksDocument {
            keys: iter.into_iter().collect(),
        }
        .into()
    }
}
