use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::{Filter, FilterError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Duplicate record id: {0}")]
    DuplicateId(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence behind every collection handle. Records are JSON objects
/// keyed by entity kind and string id; the store performs no schema checks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Make the backing storage for `kind` ready. Called once per kind at startup.
    async fn prepare(&self, _kind: &str) -> Result<(), StoreError> {
        Ok(())
    }

    /// Records of `filter.table_name()` matching an already validated filter
    async fn find(&self, filter: &Filter) -> Result<Vec<Map<String, Value>>, StoreError>;

    async fn get(&self, kind: &str, id: &str) -> Result<Option<Map<String, Value>>, StoreError>;

    async fn insert(&self, kind: &str, id: &str, record: Map<String, Value>) -> Result<(), StoreError>;

    /// Returns false when no record with `id` exists
    async fn replace(&self, kind: &str, id: &str, record: Map<String, Value>) -> Result<bool, StoreError>;

    /// Returns false when no record with `id` exists
    async fn delete(&self, kind: &str, id: &str) -> Result<bool, StoreError>;
}

impl std::fmt::Debug for dyn RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordStore({})", self.name())
    }
}
