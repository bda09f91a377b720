//! Relay startup and shutdown.

use crate::config::Config;
use crate::handlers::{build_router, AppState};
use crate::{ingest, metrics};
use anyhow::{Context, Result};
use pmu_core::{IngestAdapter, Relay};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Run the relay until a shutdown signal or an ingest failure.
///
/// # Errors
///
/// Returns an error if startup fails, the HTTP server fails, or an inbound
/// channel stops.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.bind_addr()?;

    // Start metrics server if enabled
    if config.metrics.enabled {
        match metrics::start_metrics_server(config.metrics.port) {
            Ok(_) => metrics::init_metrics(),
            Err(e) => error!("Failed to start metrics server: {:#}", e),
        }
    }

    let relay = Arc::new(Relay::new());
    let adapter = IngestAdapter::new(Arc::clone(&relay));
    let mut ingest_tasks = ingest::start(&config.ingest, &adapter).await?;

    let app = build_router(Arc::new(AppState::new(relay, config.clone())));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("PMU relay listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    let result = tokio::select! {
        served = server => served.context("HTTP server failed"),
        finished = ingest_tasks.join_next() => {
            let err = ingest::ended(finished);
            error!("{:#}", err);
            Err(err)
        }
    };

    ingest_tasks.shutdown().await;
    info!("PMU relay shut down");
    result
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
