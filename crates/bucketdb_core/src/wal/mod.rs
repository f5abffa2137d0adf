//! The durable log.
//!
//! The database file is an append-only sequence of framed records. A write
//! transaction is appended as one batch, `Begin, mutations..., Commit`, and
//! the batch is synced before the commit is acknowledged. Opening the
//! database replays every committed transaction in order to rebuild the
//! bucket directory.
//!
//! ## Record Format
//!
//! ```text
//! | magic "BKVL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! Integers are little-endian. The CRC covers header and payload.
//!
//! ## Recovery Policy
//!
//! Tolerated, treated as the end of the log and truncated away:
//!
//! - a header or payload cut short at the end of the file (torn write)
//! - a `Begin` and mutations with no matching `Commit`
//!
//! Fatal, the database refuses to open:
//!
//! - CRC mismatch
//! - bad magic, unsupported version, or unknown record type
//! - a complete record whose payload does not parse
//! - a committed mutation that contradicts the replayed state

mod iterator;
mod record;
mod recovery;
mod writer;

pub(crate) use record::{encode_records, WalRecord};
pub(crate) use recovery::{recover, RecoveredState};
pub(crate) use writer::WalManager;
