use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use vizrev_core::{init_tracing, level_for};
use vizrev_state::{SurrealHandle, SurrealReleaseStore, SurrealRepositoryStore};
use vizrevd::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.json, level_for(config.verbose));

    let handle = Arc::new(
        SurrealHandle::setup_from_env()
            .await
            .context("Failed to connect to vizrev database")?,
    );
    let state = AppState::new(
        Arc::new(SurrealReleaseStore::new(handle.clone())),
        Arc::new(SurrealRepositoryStore::new(handle)),
        config.max_update_attempts,
    );

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!(addr = %config.bind, version = vizrev_core::VERSION, "vizrevd listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("vizrevd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
