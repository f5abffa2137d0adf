//! The bucket directory.

use crate::bucket::name::BucketName;
use crate::error::{CoreError, CoreResult};
use crate::types::BucketId;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// Largest accepted key, in bytes.
pub const MAX_KEY_SIZE: usize = 32 * 1024;

/// Largest accepted value, in bytes.
pub const MAX_VALUE_SIZE: usize = (1 << 31) - 2;

/// Rejects empty and oversized keys.
pub(crate) fn validate_key(key: &[u8]) -> CoreResult<()> {
    if key.is_empty() {
        return Err(CoreError::KeyRequired);
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(CoreError::KeyTooLarge {
            len: key.len(),
            max: MAX_KEY_SIZE,
        });
    }
    Ok(())
}

/// Rejects oversized values.
pub(crate) fn validate_value(value: &[u8]) -> CoreResult<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(CoreError::ValueTooLarge {
            len: value.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(())
}

/// One bucket: a stable identity and its ordered items.
#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    id: BucketId,
    items: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Bucket {
    fn new(id: BucketId) -> Self {
        Self {
            id,
            items: BTreeMap::new(),
        }
    }

    pub(crate) fn id(&self) -> BucketId {
        self.id
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.items.get(key).map(Vec::as_slice)
    }

    pub(crate) fn keys(&self) -> Vec<Vec<u8>> {
        self.items.keys().cloned().collect()
    }

    pub(crate) fn items(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.items.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub(crate) fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.items
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Name-to-bucket map plus the bucket id counter.
#[derive(Debug, Clone, Default)]
pub(crate) struct BucketDirectory {
    buckets: BTreeMap<BucketName, Arc<Bucket>>,
    next_bucket_id: u64,
}

impl BucketDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.buckets.keys().map(|n| n.as_str().to_owned()).collect()
    }

    pub(crate) fn contains(&self, name: &BucketName) -> bool {
        self.buckets.contains_key(name)
    }

    pub(crate) fn bucket(&self, name: &BucketName) -> CoreResult<&Bucket> {
        self.buckets
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| CoreError::bucket_not_found(name.as_str()))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&BucketName, &Bucket)> {
        self.buckets.iter().map(|(n, b)| (n, b.as_ref()))
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn item_count(&self) -> usize {
        self.buckets.values().map(|b| b.len()).sum()
    }

    pub(crate) fn next_bucket_id(&self) -> u64 {
        self.next_bucket_id
    }

    /// Raises the id counter; never lowers it.
    pub(crate) fn reserve_bucket_ids(&mut self, next: u64) {
        self.next_bucket_id = self.next_bucket_id.max(next);
    }

    /// Creates an empty bucket with a fresh id.
    pub(crate) fn create(&mut self, name: BucketName) -> CoreResult<BucketId> {
        let id = BucketId::new(self.next_bucket_id);
        self.create_with_id(name, id)?;
        Ok(id)
    }

    /// Creates an empty bucket with a known id, as recorded in the log.
    pub(crate) fn create_with_id(&mut self, name: BucketName, id: BucketId) -> CoreResult<()> {
        if self.buckets.contains_key(&name) {
            return Err(CoreError::bucket_exists(name.into_string()));
        }
        self.buckets.insert(name, Arc::new(Bucket::new(id)));
        self.reserve_bucket_ids(id.as_u64() + 1);
        Ok(())
    }

    pub(crate) fn delete(&mut self, name: &BucketName) -> CoreResult<()> {
        self.buckets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CoreError::bucket_not_found(name.as_str()))
    }

    pub(crate) fn put(&mut self, name: &BucketName, key: Vec<u8>, value: Vec<u8>) -> CoreResult<()> {
        self.bucket_mut(name)?.items.insert(key, value);
        Ok(())
    }

    /// Removes a key. An absent key in an existing bucket is not an error.
    pub(crate) fn delete_key(&mut self, name: &BucketName, key: &[u8]) -> CoreResult<()> {
        let bucket = self
            .buckets
            .get_mut(name)
            .ok_or_else(|| CoreError::bucket_not_found(name.as_str()))?;
        if bucket.items.contains_key(key) {
            Arc::make_mut(bucket).items.remove(key);
        }
        Ok(())
    }

    fn bucket_mut(&mut self, name: &BucketName) -> CoreResult<&mut Bucket> {
        self.buckets
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| CoreError::bucket_not_found(name.as_str()))
    }
}
