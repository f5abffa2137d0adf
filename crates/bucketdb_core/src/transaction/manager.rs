//! Transaction manager.

use crate::bucket::BucketDirectory;
use crate::error::{CoreError, CoreResult};
use crate::stats::TransactionCounters;
use crate::transaction::read::ReadTransaction;
use crate::transaction::write::WriteTransaction;
use crate::types::{SequenceNumber, TransactionId};
use crate::wal::{RecoveredState, WalManager, WalRecord};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// An immutable committed state.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub(crate) sequence: SequenceNumber,
    pub(crate) directory: BucketDirectory,
}

/// Observable state of the coordinator.
///
/// `Idle` is zero readers and no writer; readers and the single writer
/// coexist freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorState {
    /// Number of open read transactions.
    pub readers: usize,
    /// Whether a write transaction holds the writer slot.
    pub writer_active: bool,
}

impl CoordinatorState {
    /// Returns `true` when no transaction is open.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.readers == 0 && !self.writer_active
    }
}

/// Coordinates one writer and many readers over the committed state.
///
/// ## Single-Writer Guarantee
///
/// The writer slot is a mutex held for the lifetime of a
/// [`WriteTransaction`]. A second `begin_write` blocks until the first
/// writer commits, rolls back, or is dropped, or until its timeout runs out.
///
/// ## Snapshot Isolation
///
/// The committed state is an `Arc<Snapshot>` behind a lock held only long
/// enough to clone or swap the pointer. Readers keep the `Arc` they cloned,
/// so a commit never changes what an open reader sees.
pub struct TransactionManager {
    wal: WalManager,
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
    next_txid: AtomicU64,
    readers: AtomicUsize,
    writer_active: AtomicBool,
    closed: AtomicBool,
    write_timeout: Option<Duration>,
    counters: TransactionCounters,
}

impl TransactionManager {
    pub(crate) fn new(
        wal: WalManager,
        recovered: RecoveredState,
        write_timeout: Option<Duration>,
    ) -> Self {
        Self {
            wal,
            current: RwLock::new(Arc::new(Snapshot {
                sequence: recovered.sequence,
                directory: recovered.directory,
            })),
            writer: Mutex::new(()),
            next_txid: AtomicU64::new(recovered.next_txid),
            readers: AtomicUsize::new(0),
            writer_active: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            write_timeout,
            counters: TransactionCounters::default(),
        }
    }

    /// Begins a read transaction over the latest committed state.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after the database has been closed.
    pub fn begin_read(&self) -> CoreResult<ReadTransaction<'_>> {
        self.ensure_open()?;
        self.readers.fetch_add(1, Ordering::SeqCst);
        self.counters.record_read();
        let snapshot = Arc::clone(&self.current.read());
        Ok(ReadTransaction::new(self, self.allocate_txid(), snapshot))
    }

    /// Begins a write transaction, waiting for the writer slot up to the
    /// configured default timeout.
    ///
    /// # Errors
    ///
    /// Returns `WriteTimeout` if the slot stays taken past the timeout and
    /// `DatabaseClosed` after the database has been closed.
    pub fn begin_write(&self) -> CoreResult<WriteTransaction<'_>> {
        let guard = self.acquire_writer(self.write_timeout)?;
        Ok(self.start_write(guard))
    }

    /// Begins a write transaction, waiting at most `timeout` for the slot.
    ///
    /// # Errors
    ///
    /// Returns `WriteTimeout` if the slot is not acquired in time and
    /// `DatabaseClosed` after the database has been closed.
    pub fn begin_write_timeout(&self, timeout: Duration) -> CoreResult<WriteTransaction<'_>> {
        let guard = self.acquire_writer(Some(timeout))?;
        Ok(self.start_write(guard))
    }

    /// Returns the number of open readers and whether a writer is active.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        CoordinatorState {
            readers: self.readers.load(Ordering::SeqCst),
            writer_active: self.writer_active.load(Ordering::SeqCst),
        }
    }

    /// Returns the sequence number of the latest commit.
    #[must_use]
    pub fn committed_sequence(&self) -> SequenceNumber {
        self.current.read().sequence
    }

    /// Returns `true` once the database has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_closed() {
            return Err(CoreError::DatabaseClosed);
        }
        Ok(())
    }

    fn allocate_txid(&self) -> TransactionId {
        TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst))
    }

    fn acquire_writer(&self, timeout: Option<Duration>) -> CoreResult<MutexGuard<'_, ()>> {
        self.ensure_open()?;
        let guard = match timeout {
            Some(waited) => self
                .writer
                .try_lock_for(waited)
                .ok_or(CoreError::WriteTimeout { waited })?,
            None => self.writer.lock(),
        };
        // Close may have won the slot while we waited.
        self.ensure_open()?;
        self.writer_active.store(true, Ordering::SeqCst);
        Ok(guard)
    }

    fn start_write<'a>(&'a self, guard: MutexGuard<'a, ()>) -> WriteTransaction<'a> {
        let base = Arc::clone(&self.current.read());
        WriteTransaction::new(
            self,
            guard,
            self.allocate_txid(),
            base.sequence,
            base.directory.clone(),
        )
    }

    pub(crate) fn end_read(&self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn counters(&self) -> &TransactionCounters {
        &self.counters
    }

    pub(crate) fn release_writer(&self) {
        self.writer_active.store(false, Ordering::SeqCst);
    }

    /// Makes a write transaction durable and then visible.
    ///
    /// Must be called with the writer slot held.
    pub(crate) fn commit(
        &self,
        txid: TransactionId,
        ops: Vec<WalRecord>,
        directory: BucketDirectory,
    ) -> CoreResult<SequenceNumber> {
        let base = self.committed_sequence();
        if ops.is_empty() {
            debug!(%txid, "nothing to commit");
            self.counters.record_commit();
            return Ok(base);
        }

        let sequence = base.next();
        let mutations = ops.len();
        let mut records = Vec::with_capacity(mutations + 2);
        records.push(WalRecord::Begin { txid });
        records.extend(ops);
        records.push(WalRecord::Commit { txid, sequence });
        if let Err(e) = self.wal.append_batch(&records) {
            self.counters.record_failed_commit();
            return Err(e);
        }

        *self.current.write() = Arc::new(Snapshot {
            sequence,
            directory,
        });
        self.counters.record_commit();
        debug!(%txid, %sequence, mutations, "transaction committed");
        Ok(sequence)
    }

    /// Runs `f` with the writer slot held and the committed state in hand.
    ///
    /// Used for maintenance that must not interleave with commits. `f` gets
    /// a fresh transaction id to record its work under.
    pub(crate) fn exclusive<R>(
        &self,
        f: impl FnOnce(&WalManager, &Snapshot, TransactionId) -> CoreResult<R>,
    ) -> CoreResult<R> {
        let _guard = self.acquire_writer(None)?;
        let snapshot = Arc::clone(&self.current.read());
        let result = f(&self.wal, &snapshot, self.allocate_txid());
        self.release_writer();
        result
    }

    pub(crate) fn log_size(&self) -> CoreResult<u64> {
        self.wal.size()
    }

    pub(crate) fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Waits for the active writer, syncs the log, and refuses new work.
    ///
    /// Returns `false` if the manager was already closed.
    pub(crate) fn close(&self) -> CoreResult<bool> {
        let _guard = self.writer.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        self.wal.sync()?;
        Ok(true)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("sequence", &self.committed_sequence())
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .field("log_poisoned", &self.wal.is_poisoned())
            .finish()
    }
}
