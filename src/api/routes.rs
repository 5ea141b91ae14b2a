/*
 * Responsibility
 * - URL layout: POST /authz (proxy check call), GET /health
 * - Paths are fixed by the proxy filter configuration, so no version prefix
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{authz::authz, health::health};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/authz", post(authz))
        .route("/health", get(health))
}
