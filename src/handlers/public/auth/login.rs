// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{accounts, token_response};
use crate::auth::verify_password;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult};
use crate::registry::Registry;
use crate::schema::builtin::{LOGIN_FIELD, SECRET_FIELD};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - Authenticate credentials and receive a JWT
pub async fn login_post(
    Extension(registry): Extension<Arc<Registry>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Value> {
    let accounts = accounts(&registry)?;

    let mut where_clause = Map::new();
    where_clause.insert(LOGIN_FIELD.to_string(), Value::String(request.email.trim().to_lowercase()));
    let mut filter = FilterData::matching(where_clause);
    filter.limit = Some(1);

    let account = accounts.find(filter).await?.into_iter().next();

    let verified = account.filter(|account| {
        account
            .get(SECRET_FIELD)
            .and_then(Value::as_str)
            .map(|stored| verify_password(&request.password, stored))
            .unwrap_or(false)
    });

    match verified {
        Some(account) => {
            tracing::info!("Login succeeded for {}", request.email);
            Ok(ApiResponse::success(token_response(&accounts, account)?))
        }
        None => {
            tracing::warn!("Login failed for {}", request.email);
            Err(ApiError::unauthorized("Invalid email or password"))
        }
    }
}
