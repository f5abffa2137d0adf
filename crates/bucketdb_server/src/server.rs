//! Server startup and lifecycle

use crate::{routes, AppState, ServerConfig};
use bucketdb_core::Database;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Serves the API until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server(db: Arc<Database>, config: ServerConfig) -> anyhow::Result<()> {
    run_server_with_shutdown(db, config, std::future::pending()).await
}

/// Serves the API until `shutdown_signal` resolves, then drains open
/// requests.
///
/// The database is left open; closing it is the caller's job.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server_with_shutdown(
    db: Arc<Database>,
    config: ServerConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(db, config));
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "BucketDB API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("server shutdown complete");
    Ok(())
}
