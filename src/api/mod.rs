/*
 * Responsibility
 * - HTTP surface consumed by the proxy (check call + liveness)
 */
pub mod dto;
pub mod handlers;
mod routes;

pub use routes::routes;
