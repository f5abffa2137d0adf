//! Item handlers.

use super::bucket_name;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bucketdb_codec::{encode_key, BucketItem, Value};
use bucketdb_core::{BucketRead, CoreError};
use std::sync::Arc;

/// POST /v1/buckets/{name} - Add item from `{"Key": ..., "Value": ...}`
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let name = bucket_name(&name)?;
    let item: BucketItem =
        serde_json::from_slice(&body).map_err(|source| ApiError::ItemDecode { source })?;
    let key = item.encode_key();
    let value = item
        .encode_value()
        .map_err(|source| ApiError::ItemEncode { source })?;

    state
        .write(move |tx| tx.put(&name, &key, &value))
        .await?
        .map_err(ApiError::storage("error creating bucket item"))?;
    Ok(StatusCode::OK)
}

/// GET /v1/buckets/{name}/{key} - Get item value
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path((name, key)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let name = bucket_name(&name)?;
    let stored_key = encode_key(&key);
    let stored = state.read(move |tx| tx.get(&name, &stored_key)).await??;
    if stored.is_empty() {
        return Err(ApiError::ItemNotFound);
    }
    let item = BucketItem::from_stored(key, &stored).map_err(CoreError::from)?;
    Ok(Json(item.value))
}

/// PUT /v1/buckets/{name}/{key} - Replace item value, echoing it back
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((name, key)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let name = bucket_name(&name)?;
    let value: Value =
        serde_json::from_slice(&body).map_err(|source| ApiError::ItemDecode { source })?;
    let item = BucketItem::new(key, value);
    let key = item.encode_key();
    let encoded = item
        .encode_value()
        .map_err(|source| ApiError::ItemEncode { source })?;

    state
        .write(move |tx| tx.put(&name, &key, &encoded))
        .await?
        .map_err(ApiError::storage("error updating bucket item"))?;
    Ok(Json(item.value))
}

/// DELETE /v1/buckets/{name}/{key} - Delete item
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path((name, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let name = bucket_name(&name)?;
    let key = encode_key(&key);
    state
        .write(move |tx| tx.delete(&name, &key))
        .await?
        .map_err(ApiError::storage("error deleting bucket item"))?;
    Ok(StatusCode::OK)
}
