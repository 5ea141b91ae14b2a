//! Bearer token verification against the identity provider's signing keys.
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::services::authz::error::AuthzError;
use crate::services::keys::{KeySource, SigningKey};

/// Verified token payload, in the order the claims appear in the token.
pub type Claims = Map<String, Value>;

/// Claim validation knobs.
///
/// Audience verification is off unless a deployment turns it on: existing
/// clients present tokens whose `aud` does not name this service.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub verify_audience: bool,
    pub audience: String,
    // Clock skew allowance for exp/nbf, seconds.
    pub leeway_seconds: u64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            verify_audience: false,
            audience: "account".to_string(),
            leeway_seconds: 0,
        }
    }
}

impl TokenPolicy {
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.leeway_seconds;
        // exp/nbf are checked when present but not required.
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_nbf = true;
        if self.verify_audience {
            validation.set_audience(&[self.audience.as_str()]);
        } else {
            validation.validate_aud = false;
        }
        validation
    }
}

/// RS256 verifier.
pub struct TokenVerifier {
    keys: Arc<dyn KeySource>,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(keys: Arc<dyn KeySource>, policy: &TokenPolicy) -> Self {
        Self {
            keys,
            validation: policy.validation(),
        }
    }

    /// Verify the signature and time claims of `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthzError> {
        // The header is read unverified only to pick the key.
        let header = jsonwebtoken::decode_header(token)?;
        let kid = header.kid.ok_or(AuthzError::MissingKeyId)?;

        let jwk = self.keys.get_key(&kid).await?;
        let decoding_key = decoding_key(&kid, &jwk)?;

        let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

fn decoding_key(kid: &str, jwk: &SigningKey) -> Result<DecodingKey, AuthzError> {
    let unsupported = || AuthzError::UnsupportedKey {
        kid: kid.to_string(),
        kty: jwk.kty.clone(),
    };

    if jwk.kty != "RSA" {
        return Err(unsupported());
    }
    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        return Err(unsupported());
    };

    if jwk.key_use.as_deref() == Some("enc") {
        tracing::debug!(kid, "token kid points at a key published for encryption");
    }

    Ok(DecodingKey::from_rsa_components(n, e)?)
}
