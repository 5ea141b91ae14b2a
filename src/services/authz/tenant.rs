//! Tenant and user identity extraction from verified claims.
use serde_json::Value;

use crate::services::authz::token::Claims;

pub const UNKNOWN_USER: &str = "unknown";

/// Tenant carried by the token, if any.
///
/// Lookup order:
/// 1. top-level `tenant_id`, when non-empty
/// 2. the first `resource_access.<client>` object that has a `tenant_id` key
///
/// For (2) "first" means claim-document order. If several clients carry
/// different tenant ids, whichever client the identity provider serialized
/// first wins. The scan stops at the first client carrying the key even when
/// its value is empty, leaving the caller to fall back to the default tenant.
pub fn tenant_from_claims(claims: &Claims) -> Option<String> {
    if let Some(tenant) = claims.get("tenant_id").and_then(claim_text) {
        return Some(tenant);
    }

    claims
        .get("resource_access")
        .and_then(Value::as_object)?
        .values()
        .filter_map(Value::as_object)
        .find_map(|client| client.get("tenant_id"))
        .and_then(claim_text)
}

pub fn user_id(claims: &Claims) -> String {
    string_claim(claims, "preferred_username")
}

pub fn user_email(claims: &Claims) -> String {
    string_claim(claims, "email")
}

fn string_claim(claims: &Claims, name: &str) -> String {
    claims
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_USER)
        .to_string()
}

// Non-empty strings, or numbers rendered as text.
fn claim_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
