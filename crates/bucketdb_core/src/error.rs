//! Error types for the BucketDB engine.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
///
/// Callers that translate engine errors into another protocol (the HTTP
/// server, for one) match on the kind rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: blank bucket name, empty or oversized key or value.
    Validation,
    /// A bucket that the operation needs does not exist.
    NotFound,
    /// A bucket with the requested name already exists.
    Conflict,
    /// A stored value could not be encoded or decoded.
    Codec,
    /// The writer slot was not acquired in time.
    Timeout,
    /// Durable store failure, lock contention, or use after close.
    Storage,
}

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The named bucket does not exist.
    #[error("bucket doesn't exist")]
    BucketNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A bucket with this name already exists.
    #[error("bucket already exists")]
    BucketExists {
        /// Name that was requested.
        name: String,
    },

    /// The bucket name is blank after trimming.
    #[error("invalid bucket name")]
    InvalidBucketName,

    /// The key is empty.
    #[error("key required")]
    KeyRequired,

    /// The key exceeds the size limit.
    #[error("key too large: {len} bytes, limit {max}")]
    KeyTooLarge {
        /// Size of the rejected key.
        len: usize,
        /// Maximum key size.
        max: usize,
    },

    /// The value exceeds the size limit.
    #[error("value too large: {len} bytes, limit {max}")]
    ValueTooLarge {
        /// Size of the rejected value.
        len: usize,
        /// Maximum value size.
        max: usize,
    },

    /// The writer slot could not be acquired in time.
    #[error("timed out after {waited:?} waiting for the write transaction slot")]
    WriteTimeout {
        /// How long the caller waited.
        waited: Duration,
    },

    /// Another process holds the database lock.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,

    /// The database has been closed.
    #[error("database is closed")]
    DatabaseClosed,

    /// The database file does not exist and creation was disabled.
    #[error("database not found: {path}")]
    DatabaseNotFound {
        /// Path that was opened.
        path: String,
    },

    /// The transaction has already been committed or rolled back.
    #[error("transaction is closed")]
    TransactionClosed,

    /// The log holds a record that cannot be parsed.
    #[error("log corruption at offset {offset}: {message}")]
    LogCorruption {
        /// Byte offset of the offending record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A record checksum did not match its contents.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Byte offset of the offending record.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Checksum computed over the record.
        actual: u32,
    },

    /// An earlier failure left the log in a state that further appends
    /// would corrupt.
    #[error("log is unusable: {reason}")]
    LogUnusable {
        /// The failure that stopped the log.
        reason: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] bucketdb_storage::StorageError),

    /// A document failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] bucketdb_codec::CodecError),

    /// I/O error outside the storage backend (lock file, directory sync).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates a bucket-not-found error.
    pub fn bucket_not_found(name: impl Into<String>) -> Self {
        Self::BucketNotFound { name: name.into() }
    }

    /// Creates a bucket-exists error.
    pub fn bucket_exists(name: impl Into<String>) -> Self {
        Self::BucketExists { name: name.into() }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates a log-unusable error.
    pub fn log_unusable(reason: impl Into<String>) -> Self {
        Self::LogUnusable {
            reason: reason.into(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBucketName
            | Self::KeyRequired
            | Self::KeyTooLarge { .. }
            | Self::ValueTooLarge { .. } => ErrorKind::Validation,
            Self::BucketNotFound { .. } => ErrorKind::NotFound,
            Self::BucketExists { .. } => ErrorKind::Conflict,
            Self::Codec(_) => ErrorKind::Codec,
            Self::WriteTimeout { .. } => ErrorKind::Timeout,
            Self::DatabaseLocked
            | Self::DatabaseClosed
            | Self::DatabaseNotFound { .. }
            | Self::TransactionClosed
            | Self::LogCorruption { .. }
            | Self::ChecksumMismatch { .. }
            | Self::LogUnusable { .. }
            | Self::Storage(_)
            | Self::Io(_) => ErrorKind::Storage,
        }
    }
}
