//! Transactions.
//!
//! BucketDB runs one writer at a time alongside any number of readers:
//!
//! - a [`ReadTransaction`] pins the committed state current at its start and
//!   sees nothing committed afterwards
//! - a [`WriteTransaction`] holds the single writer slot, works on a private
//!   copy of the latest state, and publishes it atomically on commit
//! - committing appends the transaction to the log and syncs it before the
//!   new state becomes visible
//!
//! Both transaction kinds end on drop: a dropped reader releases its
//! snapshot, a dropped writer that was not committed is rolled back.

mod manager;
mod read;
mod write;

pub use manager::{CoordinatorState, TransactionManager};
pub(crate) use manager::Snapshot;
pub use read::ReadTransaction;
pub use write::{TransactionState, WriteTransaction};

use crate::bucket::{BucketDirectory, BucketName};
use crate::error::CoreResult;
use bucketdb_codec::{decode_value, Value};

/// Read operations shared by both transaction kinds.
pub trait BucketRead {
    /// Returns every bucket name in byte order.
    fn list_buckets(&self) -> CoreResult<Vec<String>>;

    /// Returns whether the bucket exists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBucketName` if the name is blank.
    fn bucket_exists(&self, bucket: &str) -> CoreResult<bool>;

    /// Returns the keys of a bucket in byte order.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist.
    fn list_keys(&self, bucket: &str) -> CoreResult<Vec<Vec<u8>>>;

    /// Returns the stored value for `key`.
    ///
    /// A key that is not in the bucket yields an empty vector rather than an
    /// error. Values written through the codec are never empty, so an empty
    /// result from such a bucket means the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist.
    fn get(&self, bucket: &str, key: &[u8]) -> CoreResult<Vec<u8>>;

    /// Returns the pairs whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist.
    fn scan_prefix(&self, bucket: &str, prefix: &[u8]) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Returns the stored value decoded as JSON. An absent key reads as `null`.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist, or a codec error
    /// if the stored bytes are not JSON.
    fn get_document(&self, bucket: &str, key: &[u8]) -> CoreResult<Value> {
        Ok(decode_value(&self.get(bucket, key)?)?)
    }
}

/// The lookups behind [`BucketRead`], over whichever directory a
/// transaction sees.
pub(crate) mod lookup {
    use super::*;

    pub(crate) fn list_buckets(dir: &BucketDirectory) -> Vec<String> {
        dir.names()
    }

    pub(crate) fn bucket_exists(dir: &BucketDirectory, bucket: &str) -> CoreResult<bool> {
        Ok(dir.contains(&BucketName::parse(bucket)?))
    }

    pub(crate) fn list_keys(dir: &BucketDirectory, bucket: &str) -> CoreResult<Vec<Vec<u8>>> {
        Ok(dir.bucket(&BucketName::parse(bucket)?)?.keys())
    }

    pub(crate) fn get(dir: &BucketDirectory, bucket: &str, key: &[u8]) -> CoreResult<Vec<u8>> {
        let bucket = dir.bucket(&BucketName::parse(bucket)?)?;
        Ok(bucket.get(key).map(<[u8]>::to_vec).unwrap_or_default())
    }

    pub(crate) fn scan_prefix(
        dir: &BucketDirectory,
        bucket: &str,
        prefix: &[u8],
    ) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(dir.bucket(&BucketName::parse(bucket)?)?.scan_prefix(prefix))
    }
}
