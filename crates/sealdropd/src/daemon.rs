//! Daemon lifecycle: storage setup, router, HTTP server, shutdown

use anyhow::{Context, Result};
use sealdrop_core::config::SealdropConfig;
use sealdrop_storage::{BlobStore, OpendalBlobStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::http::{self, AppState};
use crate::metrics::{self, Metrics};

pub async fn run(config: SealdropConfig) -> Result<()> {
    let op = sealdrop_storage::build_operator(&config.storage, None)
        .context("building storage operator")?;
    let store = OpendalBlobStore::new(op, &config.storage.prefix);

    match store.check().await {
        Ok(()) => info!(backend = ?config.storage.backend, "storage: connected"),
        // Keep going; /readyz reports it until the backend comes back
        Err(e) => warn!(backend = ?config.storage.backend, "storage: {e}"),
    }

    let mut registry = metrics::new_registry();
    let metrics = Metrics::register(&mut registry);

    let state = AppState {
        store,
        kdf: config.crypto.kdf_params(),
        metrics,
        registry: Arc::new(registry),
        expose_metrics: config.server.metrics,
    };

    let max_body = usize::try_from(config.server.max_upload_mb.saturating_mul(1024 * 1024))
        .unwrap_or(usize::MAX);
    let app = http::router(state, max_body);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;

    info!(addr = %config.server.listen, "http: listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    info!("sealdropd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
