//! BucketDB server binary

use anyhow::Context;
use bucketdb_core::{Config, Database};
use bucketdb_server::{run_server_with_shutdown, ServerConfig};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bucketdb")]
#[command(about = "HTTP/JSON API over a BucketDB database")]
#[command(version)]
struct Args {
    /// Path to the database file
    #[arg(long, env = "BUCKETDB_PATH")]
    dbpath: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "BUCKETDB_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "BUCKETDB_PORT")]
    port: u16,

    /// How long to wait for the database lock, in milliseconds
    #[arg(long, default_value = "1000", env = "BUCKETDB_LOCK_TIMEOUT_MS")]
    lock_timeout_ms: u64,

    /// How long a write waits for the writer slot, in milliseconds
    #[arg(long, env = "BUCKETDB_WRITE_TIMEOUT_MS")]
    write_timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, env = "BUCKETDB_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("bucketdb={log_level},bucketdb_server={log_level},bucketdb_core={log_level},tower_http={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new()
        .lock_timeout(Duration::from_millis(args.lock_timeout_ms))
        .write_timeout(args.write_timeout_ms.map(Duration::from_millis));
    let db = Database::open_with_config(&args.dbpath, config)
        .with_context(|| format!("failed to open database at {}", args.dbpath.display()))?;
    let db = Arc::new(db);

    let server_config = ServerConfig::new(SocketAddr::new(args.host, args.port));
    let served = run_server_with_shutdown(Arc::clone(&db), server_config, shutdown_signal()).await;

    db.close().context("failed to close database")?;
    info!("exiting");
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
