/*
 * Responsibility
 * - POST /authz: the proxy's external authorization check
 * - Always 200 + allowed=true; the decision only picks the forwarded identity headers
 */
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::api::dto::authz::AuthzResponse;
use crate::services::authz::AuthzError;
use crate::state::AppState;

pub async fn authz(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let engine = Arc::clone(&state.authz);

    // Run the decision on its own task so a panic still yields the fail-open answer.
    let decision = match tokio::spawn(async move { engine.decide(&headers).await }).await {
        Ok(decision) => decision,
        Err(err) => state.authz.recover(&AuthzError::Unexpected(err.to_string())),
    };

    (StatusCode::OK, Json(AuthzResponse { result: decision }))
}
