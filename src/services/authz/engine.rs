//! Per-request authorization decision.
//!
//! This engine never denies. Whatever goes wrong while authenticating the
//! caller, the request is allowed and scoped to the default tenant. Deployments
//! that need fail-closed behaviour must change `decide`, not the handler.
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{HeaderMap, header};
use serde::Serialize;
use tracing::{info, warn};

use crate::services::authz::error::AuthzError;
use crate::services::authz::tenant;
use crate::services::authz::token::{TokenPolicy, TokenVerifier};
use crate::services::keys::KeySource;

/// Caller-supplied static tenant.
pub const TENANT_HEADER: &str = "x-tenant-id";

pub const SCOPE_ORGID_HEADER: &str = "x-scope-orgid";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Outcome of one check call.
///
/// `allowed` is always true; `headers` always carries `x-scope-orgid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthzDecision {
    pub allowed: bool,
    pub headers: BTreeMap<String, String>,
}

impl AuthzDecision {
    fn allow(tenant: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(SCOPE_ORGID_HEADER.to_string(), tenant.into());
        Self {
            allowed: true,
            headers,
        }
    }

    fn with_header(mut self, name: &str, value: String) -> Self {
        self.headers.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug)]
pub struct AuthzEngine {
    verifier: TokenVerifier,
    default_tenant: String,
}

impl AuthzEngine {
    pub fn new(keys: Arc<dyn KeySource>, policy: &TokenPolicy, default_tenant: impl Into<String>) -> Self {
        Self {
            verifier: TokenVerifier::new(keys, policy),
            default_tenant: default_tenant.into(),
        }
    }

    /// Decision used whenever the caller cannot be identified.
    pub fn fail_open(&self) -> AuthzDecision {
        AuthzDecision::allow(self.default_tenant.as_str())
    }

    pub async fn decide(&self, headers: &HeaderMap) -> AuthzDecision {
        // 1) Operator-supplied tenant beats any token.
        if let Some(tenant) = static_tenant(headers) {
            info!(tenant = %tenant, "using tenant from X-Tenant-ID header");
            return AuthzDecision::allow(tenant);
        }

        // 2) Anonymous.
        let Some(token) = bearer_token(headers) else {
            warn!(
                tenant = %self.default_tenant,
                "no bearer token or X-Tenant-ID found, using default tenant"
            );
            return self.fail_open();
        };

        // 3) Token present but unusable.
        let claims = match self.verifier.verify(token).await {
            Ok(claims) => claims,
            Err(err) => {
                self.log_rejected(&err);
                return self.fail_open();
            }
        };

        // 4) Verified.
        let tenant = tenant::tenant_from_claims(&claims).unwrap_or_else(|| {
            info!(tenant = %self.default_tenant, "no tenant_id in token, using default");
            self.default_tenant.clone()
        });

        info!(
            tenant = %tenant,
            sub = claims.get("sub").and_then(|v| v.as_str()).unwrap_or_default(),
            "request authorized"
        );

        AuthzDecision::allow(tenant)
            .with_header(USER_ID_HEADER, tenant::user_id(&claims))
            .with_header(USER_EMAIL_HEADER, tenant::user_email(&claims))
    }

    /// Report a failed evaluation and fall back to the default tenant.
    pub fn recover(&self, err: &AuthzError) -> AuthzDecision {
        self.log_rejected(err);
        self.fail_open()
    }

    fn log_rejected(&self, err: &AuthzError) {
        match err {
            AuthzError::KeyFetch(_) | AuthzError::Unexpected(_) => tracing::error!(
                kind = err.kind(),
                error = %err,
                tenant = %self.default_tenant,
                "token validation failed, using default tenant"
            ),
            _ => warn!(
                kind = err.kind(),
                error = %err,
                tenant = %self.default_tenant,
                "token validation failed, using default tenant"
            ),
        }
    }
}

// Header bytes are read as UTF-8 when valid, otherwise as Latin-1.
fn static_tenant(headers: &HeaderMap) -> Option<String> {
    let bytes = headers.get(TENANT_HEADER)?.as_bytes();
    let value = match std::str::from_utf8(bytes) {
        Ok(text) => text.trim().to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect::<String>().trim().to_string(),
    };
    (!value.is_empty()).then_some(value)
}

// Only the exact `Bearer ` scheme prefix is recognised.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
