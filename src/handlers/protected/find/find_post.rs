use axum::{
    extract::{Extension, Path},
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::filter::FilterData;
use crate::handlers::protected::data::utils::{redact_all, resolve_collection};
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::Registry;

/// POST /api/entities/:kind/find - Filtered find with a JSON body
///
/// ```json
/// { "where": { "status": "open" }, "order": "-created_date", "limit": 20 }
/// ```
pub async fn find_post(
    Path(kind): Path<String>,
    Extension(registry): Extension<Arc<Registry>>,
    Json(filter_data): Json<FilterData>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let collection = resolve_collection(&registry, &kind)?;
    let records = collection.find(filter_data).await?;
    Ok(ApiResponse::success(redact_all(&collection, records)))
}
