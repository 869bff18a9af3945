use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::utils::{filter_from_query, redact_all, resolve_collection};
use crate::database::Record;
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::Registry;

/// GET /api/entities/:kind - List records, query parameters filter by equality
pub async fn get(
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let collection = resolve_collection(&registry, &kind)?;
    let filter = filter_from_query(collection.schema(), params)?;

    let records = collection.find(filter).await?;
    Ok(ApiResponse::success(redact_all(&collection, records)))
}

/// POST /api/entities/:kind - Create one record
pub async fn post(
    Path(kind): Path<String>,
    Extension(registry): Extension<Arc<Registry>>,
    Json(payload): Json<Value>,
) -> ApiResult<Map<String, Value>> {
    let collection = resolve_collection(&registry, &kind)?;
    let record = Record::from_api_input(payload)?;

    let created = collection.insert(record.into_map()).await?;
    Ok(ApiResponse::created(collection.schema().redact(created)))
}
