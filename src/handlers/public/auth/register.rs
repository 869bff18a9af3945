// handlers/public/auth/register.rs - POST /auth/register handler

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{accounts, token_response};
use crate::auth::hash_password;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::Registry;
use crate::schema::builtin::{LOGIN_FIELD, SECRET_FIELD, TENANT_FIELD};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub tenant_id: Option<String>,
}

/// POST /auth/register - Create an account and return a token.
///
/// The role is never taken from the request; the account kind's default applies.
pub async fn register_post(
    Extension(registry): Extension<Arc<Registry>>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Value> {
    let mut field_errors = BTreeMap::new();
    if !request.email.contains('@') {
        field_errors.insert(LOGIN_FIELD.to_string(), "must be an email address".to_string());
    }
    if request.password.len() < 8 {
        field_errors.insert(SECRET_FIELD.to_string(), "must be at least 8 characters".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Invalid registration", Some(field_errors)));
    }

    let accounts = accounts(&registry)?;

    let mut account = Map::new();
    account.insert(LOGIN_FIELD.to_string(), Value::String(request.email.trim().to_lowercase()));
    account.insert(SECRET_FIELD.to_string(), Value::String(hash_password(&request.password)));
    if let Some(full_name) = request.full_name {
        account.insert("full_name".to_string(), Value::String(full_name));
    }
    if let Some(tenant_id) = request.tenant_id {
        account.insert(TENANT_FIELD.to_string(), Value::String(tenant_id));
    }

    let stored = accounts.insert(account).await?;
    tracing::info!("Registered account {}", request.email);

    Ok(ApiResponse::created(token_response(&accounts, stored)?))
}
