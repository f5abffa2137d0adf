//! # BucketDB Core
//!
//! Core database engine for BucketDB.
//!
//! This crate provides:
//! - Append-only log for durability, with crash recovery on open
//! - Named buckets of byte keys and values, iterated in key order
//! - Transactions: one writer at a time, snapshot-isolated readers
//! - Log compaction and runtime statistics
//!
//! ## Example
//!
//! ```rust
//! use bucketdb_core::{BucketRead, Database};
//!
//! let db = Database::open_in_memory()?;
//!
//! let mut tx = db.begin_write()?;
//! tx.create_bucket("fruit")?;
//! tx.put("fruit", b"item1", br#"{"name":"apple"}"#)?;
//! tx.commit()?;
//!
//! let tx = db.begin_read()?;
//! assert_eq!(tx.get("fruit", b"item1")?, br#"{"name":"apple"}"#);
//! assert!(tx.get("fruit", b"item2")?.is_empty());
//! # Ok::<(), bucketdb_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod compact;
mod config;
mod database;
mod error;
mod files;
mod stats;
mod transaction;
mod types;
mod wal;

pub use bucket::{BucketName, MAX_KEY_SIZE, MAX_VALUE_SIZE};
pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use stats::{CompactionStats, DatabaseStats};
pub use transaction::{
    BucketRead, CoordinatorState, ReadTransaction, TransactionManager, TransactionState,
    WriteTransaction,
};
pub use types::{BucketId, SequenceNumber, TransactionId};
