//! Bucket handlers.

use super::bucket_name;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bucketdb_codec::decode_key;
use bucketdb_core::{BucketRead, CoreError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Body of `POST /v1/buckets`.
#[derive(Debug, Deserialize)]
pub struct CreateBucketRequest {
    /// Name of the bucket to create.
    pub name: Option<String>,
}

/// GET /v1/buckets - List bucket names
pub async fn list_buckets(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let names = state
        .read(|tx| tx.list_buckets())
        .await?
        .map_err(ApiError::storage("error listing buckets"))?;
    Ok(Json(names))
}

/// POST /v1/buckets - Create bucket
pub async fn create_bucket(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let request: CreateBucketRequest =
        serde_json::from_slice(&body).map_err(|source| ApiError::BucketNameDecode { source })?;
    let name = bucket_name(request.name.as_deref().unwrap_or_default())?;

    let bucket = name.clone();
    let id = state.write(move |tx| tx.create_bucket(&bucket)).await??;
    debug!(bucket = %name, id = %id, "bucket created");
    Ok(StatusCode::OK)
}

/// GET /v1/buckets/{name} - List keys in a bucket
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let name = bucket_name(&name)?;
    let keys = state
        .read(move |tx| tx.list_keys(&name))
        .await?
        .map_err(|err| match err {
            err @ CoreError::BucketNotFound { .. } => ApiError::Core(err),
            err => ApiError::storage("error retrieving bucket")(err),
        })?;
    Ok(Json(keys.iter().map(|key| decode_key(key)).collect()))
}

/// DELETE /v1/buckets/{name} - Delete bucket and its items
pub async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    let name = bucket_name(&name)?;
    let bucket = name.clone();
    state.write(move |tx| tx.delete_bucket(&bucket)).await??;
    debug!(bucket = %name, "bucket deleted");
    Ok(StatusCode::OK)
}
