// handlers/public/auth/mod.rs - Public authentication handlers
//
// Accounts are records of the registry's reserved account kind.

use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::database::{Collection, ID_FIELD};
use crate::error::ApiError;
use crate::registry::Registry;
use crate::schema::builtin::{DEFAULT_ROLE, LOGIN_FIELD, ROLE_FIELD, TENANT_FIELD};

pub mod login;    // POST /auth/login - authenticate and get JWT
pub mod register; // POST /auth/register - create new account

pub use login::login_post;
pub use register::register_post;

pub(crate) fn accounts(registry: &Registry) -> Result<Arc<Collection>, ApiError> {
    registry.accounts().ok_or_else(|| {
        tracing::error!("Account kind '{}' missing from registry", registry.account_kind());
        ApiError::service_unavailable("Accounts are unavailable")
    })
}

fn text(record: &Map<String, Value>, field: &str) -> Option<String> {
    record.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Issue a token for a stored account and build the response body
pub(crate) fn token_response(accounts: &Collection, account: Map<String, Value>) -> Result<Value, ApiError> {
    let security = &config::config().security;
    let id = text(&account, ID_FIELD).ok_or_else(|| ApiError::internal_server_error("Account has no id"))?;

    let claims = Claims::new(
        id,
        text(&account, LOGIN_FIELD).unwrap_or_default(),
        text(&account, ROLE_FIELD).unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        text(&account, TENANT_FIELD),
        security.jwt_expiry_hours,
    );
    let token = generate_jwt(&claims, security)?;

    Ok(json!({
        "token": token,
        "user": accounts.schema().redact(account),
        "expires_in": security.jwt_expiry_hours * 3600
    }))
}
