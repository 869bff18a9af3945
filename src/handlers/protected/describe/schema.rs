use axum::extract::{Extension, Path};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::handlers::protected::data::utils::resolve_collection;
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::Registry;

/// GET /api/schemas - Registered entity kinds
pub async fn schema_list(Extension(registry): Extension<Arc<Registry>>) -> ApiResult<Vec<Value>> {
    let report = registry.report();
    let kinds = registry
        .kinds()
        .into_iter()
        .filter_map(|kind| registry.resolve(kind))
        .map(|collection| {
            json!({
                "name": collection.kind(),
                "fields": collection.schema().shape.fields.len(),
                "source": report.loaded.get(collection.kind())
            })
        })
        .collect();
    Ok(ApiResponse::success(kinds))
}

/// GET /api/schemas/:kind - Compiled schema of one kind
pub async fn schema_get(
    Path(kind): Path<String>,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<Value> {
    let collection = resolve_collection(&registry, &kind)?;
    Ok(ApiResponse::success(json!({
        "name": collection.kind(),
        "source": registry.report().loaded.get(collection.kind()),
        "shape": collection.schema().shape
    })))
}
