/*
 * Responsibility
 * - Start the tokio runtime
 * - Call app::run() (no logic here)
 */
use anyhow::Result;

mod api;
mod app;
mod config;
mod error;
mod middleware;
mod services;
mod state;
#[cfg(test)]
mod testutil;

#[tokio::main]
async fn main() -> Result<()> {
    app::run().await?;
    Ok(())
}
