use axum::{
    extract::{Extension, Path},
    Json,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::utils::resolve_collection;
use crate::database::Record;
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::Registry;

/// GET /api/entities/:kind/:id - Get one record
pub async fn get(
    Path((kind, id)): Path<(String, String)>,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<Map<String, Value>> {
    let collection = resolve_collection(&registry, &kind)?;
    let record = collection.get_by_id(&id).await?;
    Ok(ApiResponse::success(collection.schema().redact(record)))
}

/// PUT /api/entities/:kind/:id - Merge supplied fields into a record
pub async fn put(
    Path((kind, id)): Path<(String, String)>,
    Extension(registry): Extension<Arc<Registry>>,
    Json(payload): Json<Value>,
) -> ApiResult<Map<String, Value>> {
    let collection = resolve_collection(&registry, &kind)?;
    let changes = Record::from_api_input(payload)?;

    let updated = collection.update_by_id(&id, changes.into_map()).await?;
    Ok(ApiResponse::success(collection.schema().redact(updated)))
}

/// DELETE /api/entities/:kind/:id - Delete a record
pub async fn delete(
    Path((kind, id)): Path<(String, String)>,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<Value> {
    let collection = resolve_collection(&registry, &kind)?;
    collection.delete_by_id(&id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
