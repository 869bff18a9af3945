use axum::{extract::Extension, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::Registry;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Taskbase API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Schema-driven entity backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/register, /auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami (protected)",
                "schemas": "/api/schemas[/:kind] (protected)",
                "entities": "/api/entities/:kind[/:id] (protected)",
                "find": "/api/entities/:kind/find (protected)"
            }
        }
    }))
}

/// GET /health - Registry status and store backend
pub async fn health(Extension(registry): Extension<Arc<Registry>>) -> ApiResult<Value> {
    let report = registry.report();
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "store": registry.store().name(),
        "kinds": registry.len(),
        "fallback_account": report.fallback_used,
        "definition_failures": report.failures.len()
    })))
}
