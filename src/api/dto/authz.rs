use serde::Serialize;

use crate::services::authz::AuthzDecision;

/// Check-call response body: `{"result": {"allowed": .., "headers": {..}}}`.
#[derive(Debug, Serialize)]
pub struct AuthzResponse {
    pub result: AuthzDecision,
}
