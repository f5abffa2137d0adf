//! Application state.

use crate::config::ServerConfig;
use crate::error::ApiResult;
use bucketdb_core::{CoreResult, Database, ReadTransaction, WriteTransaction};
use std::sync::Arc;
use tokio::task;

/// Application state shared across handlers.
#[derive(Debug)]
pub struct AppState {
    /// The open database.
    pub db: Arc<Database>,
    /// Server configuration.
    pub config: ServerConfig,
}

impl AppState {
    /// Creates the state for an open database.
    pub fn new(db: Arc<Database>, config: ServerConfig) -> Self {
        Self { db, config }
    }

    /// Runs `f` in a read transaction on the blocking pool.
    ///
    /// The outer result fails only if the task itself does; the inner result
    /// is the engine's.
    pub async fn read<F, R>(&self, f: F) -> ApiResult<CoreResult<R>>
    where
        F: FnOnce(&ReadTransaction<'_>) -> CoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        Ok(task::spawn_blocking(move || db.view(f)).await?)
    }

    /// Runs `f` in a write transaction on the blocking pool, committing on
    /// success and rolling back on error.
    ///
    /// Waiting for the writer slot happens on the blocking thread, never on
    /// the async executor, and lasts at most `request_timeout`. A wait that
    /// runs out yields `WriteTimeout` with nothing written.
    pub async fn write<F, R>(&self, f: F) -> ApiResult<CoreResult<R>>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> CoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let timeout = self.config.request_timeout;
        Ok(task::spawn_blocking(move || db.update_timeout(timeout, f)).await?)
    }
}
