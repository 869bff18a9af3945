use axum::extract::Extension;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::handlers::public::auth::accounts;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::registry::Registry;

/// GET /api/auth/whoami - Token claims plus the current account record
pub async fn whoami_get(
    Extension(registry): Extension<Arc<Registry>>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let accounts = accounts(&registry)?;
    let account = accounts
        .get_by_id(&auth_user.id)
        .await
        .map_err(|_| ApiError::unauthorized("Account no longer exists"))?;

    Ok(ApiResponse::success(json!({
        "id": auth_user.id,
        "email": auth_user.email,
        "role": auth_user.role,
        "tenant_id": auth_user.tenant_id,
        "account": accounts.schema().redact(account)
    })))
}
