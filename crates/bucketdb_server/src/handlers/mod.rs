//! Request handlers.
//!
//! Each handler validates its input, runs exactly one engine operation in
//! its own transaction, and maps the outcome to a response.

mod buckets;
mod items;

pub use buckets::{create_bucket, delete_bucket, list_buckets, list_keys, CreateBucketRequest};
pub use items::{add_item, delete_item, get_item, update_item};

use crate::error::{ApiError, ApiResult};
use bucketdb_core::BucketName;

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Applies the bucket-name rule to a name from a path or body.
fn bucket_name(raw: &str) -> ApiResult<String> {
    BucketName::parse(raw)
        .map(BucketName::into_string)
        .map_err(|_| ApiError::InvalidBucketName)
}
