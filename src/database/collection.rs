use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::record::{Record, ID_FIELD};
use super::store::{RecordStore, StoreError};
use crate::filter::{Filter, FilterData, FilterError};
use crate::schema::{CompiledSchema, ValidationError};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} record not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("{kind} with {field} {value} already exists")]
    Duplicate { kind: String, field: String, value: Value },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handle to one entity kind: its compiled schema bound to the shared store.
///
/// Writes through one handle (and its clones) are serialized, so a unique
/// check and the write that follows it cannot interleave with another write
/// in this process.
#[derive(Debug, Clone)]
pub struct Collection {
    schema: Arc<CompiledSchema>,
    store: Arc<dyn RecordStore>,
    writes: Arc<Mutex<()>>,
}

impl Collection {
    pub fn new(schema: CompiledSchema, store: Arc<dyn RecordStore>) -> Self {
        Self { schema: Arc::new(schema), store, writes: Arc::new(Mutex::new(())) }
    }

    pub fn kind(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn find(&self, filter: FilterData) -> Result<Vec<Map<String, Value>>, CollectionError> {
        let filter = Filter::from_data(self.kind(), filter)?;
        Ok(self.store.find(&filter).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Map<String, Value>, CollectionError> {
        self.store
            .get(self.kind(), id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    /// Validate, default and store a new record. System fields in the input
    /// are ignored; `id` and both timestamps are assigned here.
    pub async fn insert(&self, input: Map<String, Value>) -> Result<Map<String, Value>, CollectionError> {
        let record = Record::from_api_input(Value::Object(input))
            .map_err(|e| ValidationError::single("record", e.to_string()))?;
        let prepared = self.schema.prepare_insert(record.into_map(), Utc::now())?;

        let _guard = self.writes.lock().await;
        self.ensure_unique(&prepared, None).await?;

        let id = Uuid::new_v4().to_string();
        self.store.insert(self.kind(), &id, prepared.clone()).await?;
        tracing::debug!("Inserted {} record {}", self.kind(), id);

        let mut stored = prepared;
        stored.insert(ID_FIELD.to_string(), Value::String(id));
        Ok(stored)
    }

    /// Merge a partial record over the stored one. Only supplied fields are
    /// validated; `updated_date` is refreshed.
    pub async fn update_by_id(
        &self,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<Map<String, Value>, CollectionError> {
        let _guard = self.writes.lock().await;
        let existing = self.get_by_id(id).await?;

        let now = Utc::now();
        let patch = Record::from_api_input(Value::Object(partial))
            .map_err(|e| ValidationError::single("record", e.to_string()))?;
        let patch = self.schema.validate_patch(patch.into_map(), now)?;

        let mut record = Record::from_stored(existing);
        record.apply_changes(patch);
        record.touch_updated_date(now);

        let merged = record.into_map();
        self.ensure_unique(&merged, Some(id)).await?;

        if !self.store.replace(self.kind(), id, merged.clone()).await? {
            // Deleted between read and write
            return Err(self.not_found(id));
        }
        Ok(merged)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), CollectionError> {
        if self.store.delete(self.kind(), id).await? {
            tracing::debug!("Deleted {} record {}", self.kind(), id);
            Ok(())
        } else {
            Err(self.not_found(id))
        }
    }

    async fn ensure_unique(&self, record: &Map<String, Value>, own_id: Option<&str>) -> Result<(), CollectionError> {
        for field in self.schema.unique_fields() {
            let value = match record.get(field) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            let mut where_clause = Map::new();
            where_clause.insert(field.to_string(), value.clone());
            let filter = Filter::from_data(self.kind(), FilterData::matching(where_clause))?;
            let clashes = self.store.find(&filter).await?;

            let taken = clashes
                .iter()
                .any(|other| other.get(ID_FIELD).and_then(Value::as_str) != own_id);
            if taken {
                return Err(CollectionError::Duplicate {
                    kind: self.kind().to_string(),
                    field: field.to_string(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    fn not_found(&self, id: &str) -> CollectionError {
        CollectionError::NotFound { kind: self.kind().to_string(), id: id.to_string() }
    }
}
