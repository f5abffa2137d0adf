//! Read transactions.

use crate::error::CoreResult;
use crate::transaction::manager::{Snapshot, TransactionManager};
use crate::transaction::{lookup, BucketRead};
use crate::types::{SequenceNumber, TransactionId};
use std::sync::Arc;

/// A consistent, read-only view of the database.
///
/// The view is fixed when the transaction begins. Commits made while it is
/// open are invisible to it. Dropping the transaction ends it.
pub struct ReadTransaction<'a> {
    manager: &'a TransactionManager,
    id: TransactionId,
    snapshot: Arc<Snapshot>,
}

impl<'a> ReadTransaction<'a> {
    pub(crate) fn new(
        manager: &'a TransactionManager,
        id: TransactionId,
        snapshot: Arc<Snapshot>,
    ) -> Self {
        Self {
            manager,
            id,
            snapshot,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the sequence number of the commit this view reflects.
    #[must_use]
    pub fn sequence(&self) -> SequenceNumber {
        self.snapshot.sequence
    }
}

impl BucketRead for ReadTransaction<'_> {
    fn list_buckets(&self) -> CoreResult<Vec<String>> {
        Ok(lookup::list_buckets(&self.snapshot.directory))
    }

    fn bucket_exists(&self, bucket: &str) -> CoreResult<bool> {
        lookup::bucket_exists(&self.snapshot.directory, bucket)
    }

    fn list_keys(&self, bucket: &str) -> CoreResult<Vec<Vec<u8>>> {
        lookup::list_keys(&self.snapshot.directory, bucket)
    }

    fn get(&self, bucket: &str, key: &[u8]) -> CoreResult<Vec<u8>> {
        lookup::get(&self.snapshot.directory, bucket, key)
    }

    fn scan_prefix(&self, bucket: &str, prefix: &[u8]) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        lookup::scan_prefix(&self.snapshot.directory, bucket, prefix)
    }
}

impl Drop for ReadTransaction<'_> {
    fn drop(&mut self) {
        self.manager.end_read();
    }
}

impl std::fmt::Debug for ReadTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTransaction")
            .field("id", &self.id)
            .field("sequence", &self.snapshot.sequence)
            .finish()
    }
}
