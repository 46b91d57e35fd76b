//! # marquee-api: Binary Entry Point
//!
//! Parses configuration, seeds the in-memory stores and serves the gate
//! until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use marquee_api::config::{Config, LogFormat};
use marquee_api::middleware::rate_limit::RateLimiter;
use marquee_api::state::AppState;
use marquee_api::store::{InMemoryStore, Stores};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    let rate_limit = config
        .rate_limit()
        .context("invalid rate limiter configuration")?;

    let store = match &config.fixtures {
        Some(path) => {
            let store = InMemoryStore::from_fixture_file(path)
                .with_context(|| format!("loading fixtures from {}", path.display()))?;
            tracing::info!(path = %path.display(), "seeded stores from fixtures");
            store
        }
        None => {
            tracing::warn!("no fixtures configured; every bearer token will be rejected");
            InMemoryStore::new()
        }
    };
    let stores = Stores::in_memory(Arc::new(store), config.store_timeout());

    let state = AppState::new(config.app_config(), stores, RateLimiter::new(rate_limit))
        .with_cors_origins(config.trusted_origins());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, env = %config.environment, "starting server");

    marquee_api::serve(listener, state, shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!(%addr, "stopped server");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received; draining in-flight requests");
}
