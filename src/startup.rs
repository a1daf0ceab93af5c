//! Application startup and server initialization.
//!
//! Creates the metric series once, then serves the instrumented router.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::routes;
use crate::state::AppState;

/// Builds the shared state: the single `Metrics` instance for this process.
pub fn build_state(config: Arc<ConfigV1>) -> prometheus::Result<AppState> {
    let metrics = Metrics::new(&config.metrics)?;
    Ok(AppState { config, metrics })
}

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the metric series cannot be created, the listener cannot
/// bind to the configured address, or the server fails while running.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config.clone())?;
    let metrics = state.metrics.clone();

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!(
        "Serving on {} (metrics at {})",
        config.bind_address, config.metrics.endpoint
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, unregistering metrics");
    metrics.unregister()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
