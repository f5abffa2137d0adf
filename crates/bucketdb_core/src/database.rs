//! Database facade.

use crate::compact::compaction_records;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::files::StoreFiles;
use crate::stats::{CompactionStats, DatabaseStats};
use crate::transaction::{CoordinatorState, ReadTransaction, TransactionManager, WriteTransaction};
use crate::types::SequenceNumber;
use crate::wal::{encode_records, recover, WalManager};
use bucketdb_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageResult};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// The main database handle.
///
/// A `Database` is opened once, shared by reference (or `Arc`) with
/// everything that needs it, and closed once. All access goes through
/// transactions.
///
/// # Opening a Database
///
/// ```rust,no_run
/// use bucketdb_core::{BucketRead, Database};
/// use std::path::Path;
///
/// let db = Database::open(Path::new("fruit.db"))?;
///
/// db.update(|tx| {
///     tx.create_bucket_if_not_exists("fruit")?;
///     tx.put("fruit", b"item1", br#"{"name":"apple"}"#)
/// })?;
///
/// let keys = db.view(|tx| tx.list_keys("fruit"))?;
/// assert_eq!(keys, vec![b"item1".to_vec()]);
///
/// db.close()?;
/// # Ok::<(), bucketdb_core::CoreError>(())
/// ```
///
/// # In-Memory Databases
///
/// [`Database::open_in_memory`] gives a database with the same semantics and
/// no file behind it.
pub struct Database {
    path: Option<PathBuf>,
    config: Config,
    files: Mutex<Option<StoreFiles>>,
    txn_manager: TransactionManager,
}

impl Database {
    /// Opens or creates the database file at `path` with default settings.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseLocked` if another handle holds the file past the
    /// lock timeout, and a log error if recovery finds corruption.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the database file at `path`.
    ///
    /// The `<path>.lock` file is locked first, retrying until
    /// `config.lock_timeout` has elapsed. The log is then replayed: committed
    /// transactions are applied, and an incomplete tail is cut off.
    ///
    /// # Errors
    ///
    /// - `DatabaseLocked` if the lock is not acquired in time
    /// - `DatabaseNotFound` if the file is absent and `create_if_missing` is off
    /// - `ChecksumMismatch` or `LogCorruption` if the log is damaged
    /// - `Storage` or `Io` on I/O failure
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let files = StoreFiles::lock(path, config.lock_timeout)?;
        if !config.create_if_missing && !path.exists() {
            return Err(CoreError::DatabaseNotFound {
                path: path.display().to_string(),
            });
        }

        let backend = FileBackend::open_with_create_dirs(files.log_path())?;
        let db = Self::from_backend(Box::new(backend), config, Some(path.to_path_buf()))?;
        *db.files.lock() = Some(files);
        Ok(db)
    }

    /// Opens a database over an arbitrary backend.
    ///
    /// No lock file is involved; the caller guarantees exclusive use of the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns a log error if recovery finds corruption.
    pub fn open_with_backend(
        backend: Box<dyn StorageBackend>,
        config: Config,
    ) -> CoreResult<Self> {
        Self::from_backend(backend, config, None)
    }

    /// Opens an empty in-memory database.
    ///
    /// # Errors
    ///
    /// Infallible in practice; the signature matches the other constructors.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Box::new(InMemoryBackend::new()), Config::default())
    }

    fn from_backend(
        backend: Box<dyn StorageBackend>,
        config: Config,
        path: Option<PathBuf>,
    ) -> CoreResult<Self> {
        let wal = WalManager::new(backend, config.sync_on_commit);
        let recovered = recover(&wal)?;
        info!(
            path = %path.as_deref().map_or_else(|| "<memory>".into(), |p| p.display().to_string()),
            buckets = recovered.directory.len(),
            transactions = recovered.transactions,
            sequence = %recovered.sequence,
            discarded_bytes = recovered.discarded_bytes,
            "database opened"
        );
        let txn_manager = TransactionManager::new(wal, recovered, config.write_timeout);

        Ok(Self {
            path,
            config,
            files: Mutex::new(None),
            txn_manager,
        })
    }

    /// Begins a read transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`Database::close`].
    pub fn begin_read(&self) -> CoreResult<ReadTransaction<'_>> {
        self.txn_manager.begin_read()
    }

    /// Begins a write transaction, waiting for the writer slot up to
    /// `Config::write_timeout` (forever if unset).
    ///
    /// # Errors
    ///
    /// Returns `WriteTimeout` if the wait runs out and `DatabaseClosed`
    /// after [`Database::close`].
    pub fn begin_write(&self) -> CoreResult<WriteTransaction<'_>> {
        self.txn_manager.begin_write()
    }

    /// Begins a write transaction, waiting at most `timeout` for the slot.
    ///
    /// # Errors
    ///
    /// Returns `WriteTimeout` if the wait runs out and `DatabaseClosed`
    /// after [`Database::close`].
    pub fn begin_write_timeout(&self, timeout: Duration) -> CoreResult<WriteTransaction<'_>> {
        self.txn_manager.begin_write_timeout(timeout)
    }

    /// Runs `f` inside a read transaction.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or the error from beginning the
    /// transaction.
    pub fn view<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&ReadTransaction<'_>) -> Result<R, E>,
        E: From<CoreError>,
    {
        let tx = self.begin_read()?;
        f(&tx)
    }

    /// Runs `f` inside a write transaction, committing if it returns `Ok`
    /// and rolling back if it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, from beginning the transaction, or from
    /// the commit.
    pub fn update<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> Result<R, E>,
        E: From<CoreError>,
    {
        run_update(self.begin_write()?, f)
    }

    /// Like [`Database::update`], but waits at most `timeout` for the
    /// writer slot.
    ///
    /// Nothing is written when the wait runs out, so a caller reporting the
    /// timeout never races a commit it has given up on.
    ///
    /// # Errors
    ///
    /// Returns `WriteTimeout` if the wait runs out, otherwise as
    /// [`Database::update`].
    pub fn update_timeout<F, R, E>(&self, timeout: Duration, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> Result<R, E>,
        E: From<CoreError>,
    {
        run_update(self.begin_write_timeout(timeout)?, f)
    }

    /// Rewrites the log as a single transaction holding the committed state.
    ///
    /// Runs in the writer slot, so it waits for an active writer and holds
    /// off new ones until done. On disk the compacted log is written to
    /// `<path>.compact`, synced, and renamed over the log.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`Database::close`], or the I/O error
    /// that stopped the rewrite. An error before the rename leaves the old
    /// log in place. If the renamed log cannot be reopened, every later
    /// write fails with `LogUnusable`; reads keep working.
    pub fn compact(&self) -> CoreResult<CompactionStats> {
        self.txn_manager.exclusive(|wal, snapshot, txid| {
            wal.ensure_writable()?;
            let bytes_before = wal.size()?;
            let records = compaction_records(snapshot, txid);

            let files = self.files.lock();
            match files.as_ref() {
                Some(files) => {
                    let temp_path = files.write_compacted(&encode_records(&records)?)?;
                    files.install_compacted(&temp_path)?;
                    // The old log is unlinked now; commits must follow the rename.
                    adopt_compacted_log(wal, FileBackend::open_existing(files.log_path()))?;
                    files.sync_directory()?;
                }
                None => wal.rewrite(&records)?,
            }

            let stats = CompactionStats {
                bytes_before,
                bytes_after: wal.size()?,
            };
            info!(
                bytes_before = stats.bytes_before,
                bytes_after = stats.bytes_after,
                sequence = %snapshot.sequence,
                "log compacted"
            );
            Ok(stats)
        })
    }

    /// Returns a summary of the committed state and transaction activity.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log size cannot be read.
    pub fn stats(&self) -> CoreResult<DatabaseStats> {
        let snapshot = self.txn_manager.current();
        let counters = self.txn_manager.counters();
        let state = self.txn_manager.state();
        Ok(DatabaseStats {
            buckets: snapshot.directory.len(),
            items: snapshot.directory.item_count(),
            sequence: snapshot.sequence.as_u64(),
            log_bytes: self.txn_manager.log_size()?,
            reads: counters.reads(),
            commits: counters.commits(),
            rollbacks: counters.rollbacks(),
            failed_commits: counters.failed_commits(),
            open_readers: state.readers,
            writer_active: state.writer_active,
        })
    }

    /// Returns the coordinator state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.txn_manager.state()
    }

    /// Returns the sequence number of the latest commit.
    #[must_use]
    pub fn committed_sequence(&self) -> SequenceNumber {
        self.txn_manager.committed_sequence()
    }

    /// Closes the database.
    ///
    /// Waits for an active writer to finish, syncs the log, and releases the
    /// lock file. Open read transactions keep their snapshots. Calling
    /// `close` again does nothing.
    ///
    /// # Errors
    ///
    /// Returns the error from the final sync. The database is marked closed
    /// either way.
    pub fn close(&self) -> CoreResult<()> {
        let synced = self.txn_manager.close();
        if let Some(mut files) = self.files.lock().take() {
            files.unlock()?;
        }
        if matches!(synced, Ok(true)) {
            info!("database closed");
        }
        synced.map(|_| ())
    }

    /// Returns `true` until [`Database::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.txn_manager.is_closed()
    }

    /// Returns the database file path, or `None` for a backend-only database.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the configuration the database was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn run_update<F, R, E>(mut tx: WriteTransaction<'_>, f: F) -> Result<R, E>
where
    F: FnOnce(&mut WriteTransaction<'_>) -> Result<R, E>,
    E: From<CoreError>,
{
    match f(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            if tx.is_active() {
                tx.rollback()?;
            }
            Err(e)
        }
    }
}

/// Points the log at the freshly renamed file, or poisons it when the file
/// cannot be reopened.
fn adopt_compacted_log(wal: &WalManager, reopened: StorageResult<FileBackend>) -> CoreResult<()> {
    match reopened {
        Ok(backend) => {
            wal.replace_backend(Box::new(backend));
            Ok(())
        }
        Err(e) => {
            wal.poison(format!("compacted log could not be reopened: {e}"));
            Err(e.into())
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("is_open", &self.is_open())
            .field("committed_sequence", &self.committed_sequence())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::BucketRead;
    use tempfile::tempdir;

    #[test]
    fn open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.is_open());
        assert!(db.path().is_none());
        assert!(db.state().is_idle());
    }

    #[test]
    fn update_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| tx.create_bucket("b").map(|_| ())).unwrap();
        let names = db.view(|tx| tx.list_buckets()).unwrap();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn update_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: CoreResult<()> = db.update(|tx| {
            tx.create_bucket("b")?;
            tx.put("missing", b"k", b"1")
        });

        assert!(matches!(result, Err(CoreError::BucketNotFound { .. })));
        assert!(db.view(|tx| tx.list_buckets()).unwrap().is_empty());
        assert_eq!(db.stats().unwrap().rollbacks, 1);
        assert!(db.state().is_idle());
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let db = Database::open_in_memory().unwrap();
        db.close().unwrap();
        db.close().unwrap();

        assert!(!db.is_open());
        assert!(matches!(db.begin_read(), Err(CoreError::DatabaseClosed)));
        assert!(matches!(db.begin_write(), Err(CoreError::DatabaseClosed)));
        assert!(matches!(db.compact(), Err(CoreError::DatabaseClosed)));
    }

    #[test]
    fn missing_file_without_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let err = Database::open_with_config(&path, Config::new().create_if_missing(false))
            .unwrap_err();
        assert!(matches!(err, CoreError::DatabaseNotFound { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn close_releases_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let config = Config::new().lock_timeout(Duration::from_millis(20));

        let first = Database::open_with_config(&path, config.clone()).unwrap();
        assert!(matches!(
            Database::open_with_config(&path, config.clone()),
            Err(CoreError::DatabaseLocked)
        ));

        first.close().unwrap();
        assert!(Database::open_with_config(&path, config).is_ok());
    }

    #[test]
    fn stats_reflect_committed_state() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.create_bucket("a")?;
            tx.create_bucket("b")?;
            tx.put("a", b"k1", b"1")?;
            tx.put("b", b"k2", b"2")
        })
        .unwrap();
        let _reader = db.begin_read().unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.items, 2);
        assert_eq!(stats.sequence, 1);
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.open_readers, 1);
        assert!(stats.log_bytes > 0);
    }

    #[test]
    fn update_timeout_gives_up_without_writing() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| tx.create_bucket("b").map(|_| ())).unwrap();
        let holder = db.begin_write().unwrap();

        let result: CoreResult<()> =
            db.update_timeout(Duration::from_millis(20), |tx| tx.put("b", b"k", b"1"));

        assert!(matches!(result, Err(CoreError::WriteTimeout { .. })));
        drop(holder);
        assert!(db.view(|tx| tx.list_keys("b")).unwrap().is_empty());
        db.update_timeout(Duration::from_millis(20), |tx| tx.put("b", b"k", b"1"))
            .unwrap();
        assert_eq!(db.view(|tx| tx.get("b", b"k")).unwrap(), b"1");
    }

    #[test]
    fn compaction_follows_the_renamed_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let db = Database::open(&path).unwrap();
        db.update(|tx| tx.create_bucket("b").map(|_| ())).unwrap();
        for i in 0..10 {
            db.update(|tx| tx.put("b", b"k", i.to_string().as_bytes()))
                .unwrap();
        }

        db.compact().unwrap();
        db.update(|tx| tx.put("b", b"after", b"1")).unwrap();

        let on_disk = std::fs::metadata(&path).unwrap().len();
        assert_eq!(on_disk, db.stats().unwrap().log_bytes);
        db.close().unwrap();

        let db = Database::open(&path).unwrap();
        assert_eq!(db.view(|tx| tx.get("b", b"after")).unwrap(), b"1");
        assert_eq!(db.view(|tx| tx.get("b", b"k")).unwrap(), b"9");
    }

    #[test]
    fn unreopenable_compacted_log_stops_writes() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.create_bucket("b")?;
            tx.put("b", b"k", b"1")
        })
        .unwrap();

        let err = db
            .txn_manager
            .exclusive(|wal, _, _| {
                adopt_compacted_log(wal, Err(std::io::Error::other("gone").into()))
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));

        let result = db.update(|tx| tx.put("b", b"k2", b"2"));
        assert!(matches!(result, Err(CoreError::LogUnusable { .. })));
        assert!(matches!(db.compact(), Err(CoreError::LogUnusable { .. })));
        assert_eq!(db.view(|tx| tx.list_keys("b")).unwrap(), vec![b"k".to_vec()]);
        assert!(db.state().is_idle());
    }

    #[test]
    fn in_memory_compaction_shrinks_log() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| tx.create_bucket("b").map(|_| ())).unwrap();
        for i in 0..20 {
            db.update(|tx| tx.put("b", b"counter", i.to_string().as_bytes()))
                .unwrap();
        }

        let stats = db.compact().unwrap();
        assert!(stats.bytes_after < stats.bytes_before);
        assert!(stats.reclaimed() > 0);
        assert_eq!(db.view(|tx| tx.get("b", b"counter")).unwrap(), b"19");
    }
}
