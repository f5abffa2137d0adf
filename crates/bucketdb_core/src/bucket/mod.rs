//! Buckets and the bucket directory.
//!
//! The directory is the engine's namespace: an ordered map from bucket name
//! to an ordered key space. It is an immutable value once committed. Write
//! transactions work on a clone that shares untouched buckets with the
//! committed state through `Arc`, and only the buckets they modify are copied.

mod directory;
mod name;

pub use directory::{MAX_KEY_SIZE, MAX_VALUE_SIZE};
pub use name::BucketName;

pub(crate) use directory::{validate_key, validate_value, Bucket, BucketDirectory};
