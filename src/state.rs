/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 * - Cheap to clone (Arc inside)
 */
use std::sync::Arc;

use crate::services::authz::AuthzEngine;

#[derive(Clone, Debug)]
pub struct AppState {
    pub authz: Arc<AuthzEngine>,
}

impl AppState {
    pub fn new(authz: Arc<AuthzEngine>) -> Self {
        Self { authz }
    }
}
