//! # BucketDB Storage
//!
//! Byte-store backends for BucketDB.
//!
//! A backend is an **opaque, append-only byte store**. It knows nothing about
//! log records, buckets, or transactions; `bucketdb_core` owns every byte
//! layout decision and only asks a backend to read, append, flush, sync and
//! truncate.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - a single file on disk, used for the durable store
//! - [`InMemoryBackend`] - a shared in-memory buffer, used by tests and
//!   ephemeral databases
//!
//! ## Example
//!
//! ```rust
//! use bucketdb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"bucket1").unwrap();
//! assert_eq!(backend.read_at(offset, 7).unwrap(), b"bucket1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
