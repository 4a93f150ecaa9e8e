// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Retos API Server

use retos_backend::{
    config::{Config, StoreBackend},
    db::{DocumentStore, FirestoreStore, MemoryStore},
    media::LocalMediaStore,
    AppState,
};
use std::sync::Arc;
use tokio::signal::ctrl_c;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.store_backend, "Starting Retos API");

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreStore::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let media = LocalMediaStore::new(config.media_dir.clone()).await?;
    tracing::info!(path = %config.media_dir.display(), "Media store ready");

    let state = Arc::new(AppState::new(config.clone(), store, Arc::new(media)));

    // Fail fast if the store is unreachable
    state.repo.ping().await?;
    tracing::info!("Document store reachable");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(state.cleanup.clone().run(shutdown_rx));

    let app = retos_backend::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight sweep finish before exiting
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Cleanup scheduler task failed");
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("retos_backend=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
