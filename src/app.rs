/*
 * Responsibility
 * - Tracing / panic hook setup
 * - Config -> dependencies (key resolver, decision engine) -> Router
 * - axum::serve() with graceful shutdown
 */
use std::{panic, sync::Arc};

use axum::Router;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::authz::AuthzEngine;
use crate::services::keys::{KeyResolver, keycloak_certs_url};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,tenant_authz=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// Never aborts: the check handler turns a panicked decision into the
// default-tenant answer, which needs the panic to unwind.
fn init_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook();

    tracing::info!(
        "starting auth service in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    tracing::info!(
        keycloak_url = %config.keycloak_url,
        realm = %config.keycloak_realm,
        default_tenant = %config.default_tenant,
        verify_audience = config.verify_audience,
        "configuration loaded"
    );

    let (state, resolver) = build_state(&config)?;
    tracing::info!(url = resolver.certs_url(), "signing keys will be fetched on first use");
    #[cfg(unix)]
    spawn_key_reload(resolver);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("auth service stopped");
    Ok(())
}

fn build_state(config: &Config) -> Result<(AppState, Arc<KeyResolver>), AppError> {
    let certs_url = keycloak_certs_url(config.keycloak_url.as_str(), &config.keycloak_realm);
    let resolver = Arc::new(
        KeyResolver::new(certs_url, config.key_fetch_timeout)?.with_ttl(config.key_cache_ttl),
    );

    let engine = AuthzEngine::new(
        resolver.clone(),
        &config.token_policy(),
        config.default_tenant.clone(),
    );

    Ok((AppState::new(Arc::new(engine)), resolver))
}

// SIGHUP refetches the signing keys so a rotated realm key is picked up
// without a restart. A failed reload keeps the keys already cached.
#[cfg(unix)]
fn spawn_key_reload(resolver: Arc<KeyResolver>) {
    tokio::spawn(async move {
        let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGHUP");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            tracing::info!(url = resolver.certs_url(), "SIGHUP received, reloading signing keys");
            if let Err(e) = resolver.fetch_keys().await {
                tracing::warn!(error = %e, "signing key reload failed, keeping cached keys");
            }
        }
    });
}

fn build_router(state: AppState) -> Router {
    let router = api::routes().with_state(state);
    middleware::http::apply(router)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
