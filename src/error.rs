/*
 * Responsibility
 * - Startup / serving errors (config, HTTP client, listener)
 * - Request-path failures never surface here: the check endpoint always answers 200
 */
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build identity provider client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
