//! Log writer.

use crate::error::{CoreError, CoreResult};
use crate::wal::iterator::WalRecordIterator;
use crate::wal::record::{encode_records, WalRecord};
use bucketdb_storage::StorageBackend;
use parking_lot::Mutex;
use tracing::error;

/// Owns the backend holding the log.
///
/// Appends are serialized by the transaction manager's writer slot; the
/// mutex here only guards the backend against concurrent `stats` reads.
///
/// Once poisoned the manager refuses every append and rewrite for the rest
/// of its life.
pub(crate) struct WalManager {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
    poisoned: Mutex<Option<String>>,
}

impl WalManager {
    pub(crate) fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
            poisoned: Mutex::new(None),
        }
    }

    /// Stops all further writes, keeping the first reason given.
    pub(crate) fn poison(&self, reason: impl Into<String>) {
        let mut poisoned = self.poisoned.lock();
        if poisoned.is_none() {
            let reason = reason.into();
            error!(%reason, "log poisoned, refusing further writes");
            *poisoned = Some(reason);
        }
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned.lock().is_some()
    }

    pub(crate) fn ensure_writable(&self) -> CoreResult<()> {
        match self.poisoned.lock().as_ref() {
            Some(reason) => Err(CoreError::log_unusable(reason.clone())),
            None => Ok(()),
        }
    }

    /// Appends a batch of records as one write and makes it durable.
    ///
    /// Returns the offset the batch starts at. If the write fails, the log
    /// is cut back to where the batch started so a later append never lands
    /// behind a half-written record. If the cut-back fails too, the manager
    /// is poisoned.
    pub(crate) fn append_batch(&self, records: &[WalRecord]) -> CoreResult<u64> {
        self.ensure_writable()?;
        let data = encode_records(records)?;
        let mut backend = self.backend.lock();
        let start = backend.size()?;

        let result = backend.append(&data).and_then(|offset| {
            backend.flush()?;
            if self.sync_on_commit {
                backend.sync()?;
            }
            Ok(offset)
        });

        match result {
            Ok(offset) => Ok(offset),
            Err(e) => {
                if let Err(rollback) = backend.truncate(start) {
                    self.poison(format!(
                        "failed to cut back log to offset {start} after write error: {rollback}"
                    ));
                }
                Err(e.into())
            }
        }
    }

    /// Returns a streaming iterator over the log.
    ///
    /// The backend stays locked until the iterator is dropped.
    pub(crate) fn iter(&self) -> CoreResult<WalRecordIterator<'_>> {
        WalRecordIterator::new(self.backend.lock())
    }

    pub(crate) fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    pub(crate) fn sync(&self) -> CoreResult<()> {
        let mut backend = self.backend.lock();
        backend.flush()?;
        backend.sync()?;
        Ok(())
    }

    /// Discards everything after `offset`.
    pub(crate) fn truncate(&self, offset: u64) -> CoreResult<()> {
        let mut backend = self.backend.lock();
        backend.truncate(offset)?;
        backend.sync()?;
        Ok(())
    }

    /// Swaps in a new backend, returning the old one.
    pub(crate) fn replace_backend(
        &self,
        backend: Box<dyn StorageBackend>,
    ) -> Box<dyn StorageBackend> {
        std::mem::replace(&mut *self.backend.lock(), backend)
    }

    /// Replaces the contents of the current backend in place.
    pub(crate) fn rewrite(&self, records: &[WalRecord]) -> CoreResult<()> {
        self.ensure_writable()?;
        let data = encode_records(records)?;
        let mut backend = self.backend.lock();
        backend.truncate(0)?;
        backend.append(&data)?;
        backend.flush()?;
        backend.sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SequenceNumber, TransactionId};
    use bucketdb_storage::{InMemoryBackend, StorageResult};

    fn batch(txid: u64) -> Vec<WalRecord> {
        let txid = TransactionId::new(txid);
        vec![
            WalRecord::Begin { txid },
            WalRecord::Commit {
                txid,
                sequence: SequenceNumber::new(txid.as_u64()),
            },
        ]
    }

    #[test]
    fn batches_append_in_order() {
        let backend = InMemoryBackend::new();
        let wal = WalManager::new(Box::new(backend.clone()), true);

        let first = wal.append_batch(&batch(1)).unwrap();
        let second = wal.append_batch(&batch(2)).unwrap();

        assert_eq!(first, 0);
        assert!(second > first);
        assert_eq!(wal.size().unwrap(), backend.data().len() as u64);

        let records: Vec<WalRecord> = wal.iter().unwrap().map(|r| r.unwrap().1).collect();
        assert_eq!(records.len(), 4);
        assert_eq!(records[2], batch(2)[0]);
    }

    /// Accepts a few bytes of every append, then fails.
    struct ShortWriteBackend {
        inner: InMemoryBackend,
        truncate_fails: bool,
    }

    impl StorageBackend for ShortWriteBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }
        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            self.inner.append(&data[..data.len().min(5)])?;
            Err(std::io::Error::other("disk full").into())
        }
        fn flush(&mut self) -> StorageResult<()> {
            Ok(())
        }
        fn sync(&mut self) -> StorageResult<()> {
            Ok(())
        }
        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }
        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            if self.truncate_fails {
                return Err(std::io::Error::other("read-only file system").into());
            }
            self.inner.truncate(new_size)
        }
    }

    #[test]
    fn failed_append_is_cut_back() {
        let inner = InMemoryBackend::with_data(encode_records(&batch(1)).unwrap());
        let before = inner.data();
        let wal = WalManager::new(
            Box::new(ShortWriteBackend {
                inner: inner.clone(),
                truncate_fails: false,
            }),
            true,
        );

        assert!(wal.append_batch(&batch(2)).is_err());
        assert_eq!(inner.data(), before);
        assert!(!wal.is_poisoned());
    }

    #[test]
    fn failed_cut_back_poisons_the_log() {
        let inner = InMemoryBackend::with_data(encode_records(&batch(1)).unwrap());
        let wal = WalManager::new(
            Box::new(ShortWriteBackend {
                inner: inner.clone(),
                truncate_fails: true,
            }),
            true,
        );

        let err = wal.append_batch(&batch(2)).unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(wal.is_poisoned());
        let torn = inner.data();

        let err = wal.append_batch(&batch(3)).unwrap_err();
        assert!(matches!(err, CoreError::LogUnusable { .. }));
        assert!(matches!(wal.rewrite(&batch(3)), Err(CoreError::LogUnusable { .. })));
        assert_eq!(inner.data(), torn);
    }

    #[test]
    fn poison_keeps_first_reason() {
        let wal = WalManager::new(Box::new(InMemoryBackend::new()), false);
        wal.poison("first");
        wal.poison("second");

        match wal.append_batch(&batch(1)) {
            Err(CoreError::LogUnusable { reason }) => assert_eq!(reason, "first"),
            other => panic!("expected LogUnusable, got {other:?}"),
        }
        assert_eq!(wal.size().unwrap(), 0);
    }

    #[test]
    fn rewrite_replaces_contents() {
        let backend = InMemoryBackend::new();
        let wal = WalManager::new(Box::new(backend.clone()), false);
        wal.append_batch(&batch(1)).unwrap();
        wal.append_batch(&batch(2)).unwrap();

        wal.rewrite(&batch(3)).unwrap();

        assert_eq!(backend.data(), encode_records(&batch(3)).unwrap());
    }
}
