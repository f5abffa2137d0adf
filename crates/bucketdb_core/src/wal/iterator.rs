//! Streaming record iterator.

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{WalRecord, WalRecordType, CRC_SIZE, HEADER_SIZE, WAL_MAGIC, WAL_VERSION};
use bucketdb_storage::StorageBackend;
use parking_lot::MutexGuard;

/// Reads records one at a time from the start of the log.
///
/// Each step reads one header and then one body, so memory stays bounded by
/// the largest record. Yields `(offset, record)` pairs. After a `None`,
/// [`WalRecordIterator::position`] is the end of the last complete record and
/// [`WalRecordIterator::torn_tail`] reports whether bytes past it were
/// discarded as a torn write.
pub(crate) struct WalRecordIterator<'a> {
    backend: MutexGuard<'a, Box<dyn StorageBackend>>,
    total_size: u64,
    position: u64,
    torn_tail: bool,
    finished: bool,
}

impl<'a> WalRecordIterator<'a> {
    pub(crate) fn new(backend: MutexGuard<'a, Box<dyn StorageBackend>>) -> CoreResult<Self> {
        let total_size = backend.size()?;
        Ok(Self {
            backend,
            total_size,
            position: 0,
            torn_tail: false,
            finished: false,
        })
    }

    /// Offset just past the last complete record.
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    /// Total size of the log when iteration started.
    pub(crate) fn total_size(&self) -> u64 {
        self.total_size
    }

    pub(crate) fn torn_tail(&self) -> bool {
        self.torn_tail
    }

    fn remaining(&self) -> u64 {
        self.total_size - self.position
    }

    fn read_next(&mut self) -> CoreResult<Option<(u64, WalRecord)>> {
        let offset = self.position;
        if self.remaining() == 0 {
            return Ok(None);
        }
        if self.remaining() < HEADER_SIZE as u64 {
            self.torn_tail = true;
            return Ok(None);
        }

        let header = self.backend.read_at(offset, HEADER_SIZE)?;
        if header[0..4] != WAL_MAGIC {
            return Err(CoreError::log_corruption(offset, "invalid magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version == 0 || version > WAL_VERSION {
            return Err(CoreError::log_corruption(
                offset,
                format!("unsupported version {version}"),
            ));
        }
        let type_byte = header[6];
        let record_type = WalRecordType::from_byte(type_byte).ok_or_else(|| {
            CoreError::log_corruption(offset, format!("unknown record type {type_byte}"))
        })?;
        let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);

        let body_len = u64::from(payload_len) + CRC_SIZE as u64;
        if self.remaining() - (HEADER_SIZE as u64) < body_len {
            self.torn_tail = true;
            return Ok(None);
        }

        let body = self
            .backend
            .read_at(offset + HEADER_SIZE as u64, payload_len as usize + CRC_SIZE)?;
        let (payload, crc_bytes) = body.split_at(payload_len as usize);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(payload);
        let actual = hasher.finalize();
        if actual != expected {
            return Err(CoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let record = WalRecord::decode_payload(record_type, payload, offset)?;
        self.position = offset + HEADER_SIZE as u64 + body_len;
        Ok(Some((offset, record)))
    }
}

impl Iterator for WalRecordIterator<'_> {
    type Item = CoreResult<(u64, WalRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
