//! Database statistics.
//!
//! ```rust
//! use bucketdb_core::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//! db.update(|tx| tx.create_bucket("fruit").map(|_| ())).unwrap();
//!
//! let stats = db.stats().unwrap();
//! assert_eq!(stats.buckets, 1);
//! assert_eq!(stats.commits, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic transaction counters, updated as transactions finish.
#[derive(Debug, Default)]
pub(crate) struct TransactionCounters {
    reads: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    failed_commits: AtomicU64,
}

impl TransactionCounters {
    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_commit(&self) {
        self.failed_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub(crate) fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    pub(crate) fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    pub(crate) fn failed_commits(&self) -> u64 {
        self.failed_commits.load(Ordering::Relaxed)
    }
}

/// A point-in-time summary of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseStats {
    /// Number of buckets in the committed state.
    pub buckets: usize,
    /// Number of items across all buckets.
    pub items: usize,
    /// Sequence number of the latest commit.
    pub sequence: u64,
    /// Size of the log in bytes.
    pub log_bytes: u64,
    /// Read transactions started since open.
    pub reads: u64,
    /// Write transactions committed since open, counting those with no
    /// mutations.
    pub commits: u64,
    /// Write transactions rolled back since open, explicitly or on drop.
    pub rollbacks: u64,
    /// Commits that failed to reach the log.
    pub failed_commits: u64,
    /// Read transactions currently open.
    pub open_readers: usize,
    /// Whether a writer currently holds the slot.
    pub writer_active: bool,
}

/// Outcome of [`Database::compact`](crate::Database::compact).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    /// Log size before compaction.
    pub bytes_before: u64,
    /// Log size after compaction.
    pub bytes_after: u64,
}

impl CompactionStats {
    /// Bytes released by compaction.
    #[must_use]
    pub const fn reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}
