//! Write transactions.

use crate::bucket::{validate_key, validate_value, BucketDirectory, BucketName};
use crate::error::{CoreError, CoreResult};
use crate::transaction::manager::TransactionManager;
use crate::transaction::{lookup, BucketRead};
use crate::types::{BucketId, SequenceNumber, TransactionId};
use crate::wal::WalRecord;
use bucketdb_codec::encode_value;
use parking_lot::MutexGuard;
use serde::Serialize;
use tracing::debug;

/// State of a write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back, explicitly or by a failed commit.
    Aborted,
}

/// The single active writer.
///
/// Holds the writer slot from `begin_write` until it commits, rolls back, or
/// is dropped. Mutations go to a private copy of the latest committed state,
/// which this transaction's own reads observe; nothing is visible to other
/// transactions before [`WriteTransaction::commit`] returns.
///
/// # Example
///
/// ```rust
/// use bucketdb_core::{BucketRead, Database};
///
/// let db = Database::open_in_memory().unwrap();
/// let mut tx = db.begin_write().unwrap();
/// tx.create_bucket("fruit").unwrap();
/// tx.put("fruit", b"item1", br#"{"name":"apple"}"#).unwrap();
/// tx.commit().unwrap();
///
/// let rx = db.begin_read().unwrap();
/// assert_eq!(rx.list_keys("fruit").unwrap(), vec![b"item1".to_vec()]);
/// ```
pub struct WriteTransaction<'a> {
    manager: &'a TransactionManager,
    guard: Option<MutexGuard<'a, ()>>,
    id: TransactionId,
    base: SequenceNumber,
    directory: BucketDirectory,
    ops: Vec<WalRecord>,
    state: TransactionState,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(
        manager: &'a TransactionManager,
        guard: MutexGuard<'a, ()>,
        id: TransactionId,
        base: SequenceNumber,
        directory: BucketDirectory,
    ) -> Self {
        Self {
            manager,
            guard: Some(guard),
            id,
            base,
            directory,
            ops: Vec::new(),
            state: TransactionState::Active,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the sequence number of the state this transaction started from.
    #[must_use]
    pub fn base_sequence(&self) -> SequenceNumber {
        self.base
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns `true` while the transaction can still be used.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the number of mutations waiting for commit.
    #[must_use]
    pub fn pending_mutations(&self) -> usize {
        self.ops.len()
    }

    /// Creates an empty bucket.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBucketName` for a blank name and `BucketExists` if
    /// the name is taken.
    pub fn create_bucket(&mut self, name: &str) -> CoreResult<BucketId> {
        self.ensure_active()?;
        let name = BucketName::parse(name)?;
        let bucket_id = self.directory.create(name.clone())?;
        self.ops.push(WalRecord::CreateBucket {
            txid: self.id,
            bucket_id,
            name,
        });
        Ok(bucket_id)
    }

    /// Creates the bucket unless it already exists, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBucketName` for a blank name.
    pub fn create_bucket_if_not_exists(&mut self, name: &str) -> CoreResult<BucketId> {
        self.ensure_active()?;
        let parsed = BucketName::parse(name)?;
        if self.directory.contains(&parsed) {
            return Ok(self.directory.bucket(&parsed)?.id());
        }
        self.create_bucket(name)
    }

    /// Deletes a bucket and every item in it.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist.
    pub fn delete_bucket(&mut self, name: &str) -> CoreResult<()> {
        self.ensure_active()?;
        let name = BucketName::parse(name)?;
        self.directory.delete(&name)?;
        self.ops.push(WalRecord::DeleteBucket {
            txid: self.id,
            name,
        });
        Ok(())
    }

    /// Inserts or overwrites an item.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist, `KeyRequired`
    /// for an empty key, and `KeyTooLarge` or `ValueTooLarge` past the limits.
    pub fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> CoreResult<()> {
        self.ensure_active()?;
        let bucket = BucketName::parse(bucket)?;
        validate_key(key)?;
        validate_value(value)?;
        self.directory.put(&bucket, key.to_vec(), value.to_vec())?;
        self.ops.push(WalRecord::Put {
            txid: self.id,
            bucket,
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Encodes `document` as JSON and stores it under `key`.
    ///
    /// # Errors
    ///
    /// As [`WriteTransaction::put`], plus a codec error if the document
    /// cannot be encoded.
    pub fn put_document<T: Serialize + ?Sized>(
        &mut self,
        bucket: &str,
        key: &[u8],
        document: &T,
    ) -> CoreResult<()> {
        let value = encode_value(document)?;
        self.put(bucket, key, &value)
    }

    /// Removes an item. Removing a key the bucket does not hold succeeds.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist and
    /// `KeyRequired` for an empty key.
    pub fn delete(&mut self, bucket: &str, key: &[u8]) -> CoreResult<()> {
        self.ensure_active()?;
        let bucket = BucketName::parse(bucket)?;
        validate_key(key)?;
        let present = self.directory.bucket(&bucket)?.get(key).is_some();
        if present {
            self.directory.delete_key(&bucket, key)?;
            self.ops.push(WalRecord::Delete {
                txid: self.id,
                bucket,
                key: key.to_vec(),
            });
        }
        Ok(())
    }

    /// Makes every mutation durable and visible, then releases the slot.
    ///
    /// A transaction without mutations commits without touching the log and
    /// returns the sequence it started from.
    ///
    /// # Errors
    ///
    /// Returns `TransactionClosed` if already finished, or the log error if
    /// the append fails. A failed commit leaves the committed state
    /// unchanged and the transaction aborted.
    pub fn commit(&mut self) -> CoreResult<SequenceNumber> {
        self.ensure_active()?;
        let ops = std::mem::take(&mut self.ops);
        let directory = std::mem::take(&mut self.directory);
        let result = self.manager.commit(self.id, ops, directory);
        self.state = if result.is_ok() {
            TransactionState::Committed
        } else {
            TransactionState::Aborted
        };
        self.finish();
        result
    }

    /// Discards every mutation and releases the slot.
    ///
    /// # Errors
    ///
    /// Returns `TransactionClosed` if already finished.
    pub fn rollback(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.state = TransactionState::Aborted;
        self.manager.counters().record_rollback();
        self.finish();
        debug!(txid = %self.id, "transaction rolled back");
        Ok(())
    }

    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed | TransactionState::Aborted => {
                Err(CoreError::TransactionClosed)
            }
        }
    }

    fn finish(&mut self) {
        self.ops.clear();
        self.directory = BucketDirectory::new();
        if let Some(guard) = self.guard.take() {
            self.manager.release_writer();
            drop(guard);
        }
    }
}

impl BucketRead for WriteTransaction<'_> {
    fn list_buckets(&self) -> CoreResult<Vec<String>> {
        self.ensure_active()?;
        Ok(lookup::list_buckets(&self.directory))
    }

    fn bucket_exists(&self, bucket: &str) -> CoreResult<bool> {
        self.ensure_active()?;
        lookup::bucket_exists(&self.directory, bucket)
    }

    fn list_keys(&self, bucket: &str) -> CoreResult<Vec<Vec<u8>>> {
        self.ensure_active()?;
        lookup::list_keys(&self.directory, bucket)
    }

    fn get(&self, bucket: &str, key: &[u8]) -> CoreResult<Vec<u8>> {
        self.ensure_active()?;
        lookup::get(&self.directory, bucket, key)
    }

    fn scan_prefix(&self, bucket: &str, prefix: &[u8]) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_active()?;
        lookup::scan_prefix(&self.directory, bucket, prefix)
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            self.state = TransactionState::Aborted;
            self.manager.counters().record_rollback();
            debug!(txid = %self.id, mutations = self.ops.len(), "write transaction dropped, rolling back");
        }
        self.finish();
    }
}

impl std::fmt::Debug for WriteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("id", &self.id)
            .field("base", &self.base)
            .field("state", &self.state)
            .field("pending_mutations", &self.ops.len())
            .finish()
    }
}
