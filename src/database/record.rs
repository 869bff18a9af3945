use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::schema::{CREATED_DATE, UPDATED_DATE};

pub const ID_FIELD: &str = "id";

/// System fields that can only be set by the collection, not by API input
pub const SYSTEM_FIELDS: &[&str] = &[ID_FIELD, CREATED_DATE, UPDATED_DATE];

/// Errors that can occur during Record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
}

/// A dynamic record with change tracking against its stored state
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Stored state (None for records being created)
    original: Option<Map<String, Value>>,
    fields: Map<String, Value>,
    modified_fields: HashSet<String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create record from API input JSON. System fields are dropped so that
    /// clients can send back records they previously read.
    pub fn from_api_input(json: Value) -> Result<Self, RecordError> {
        match json {
            Value::Object(map) => {
                let mut record = Self::new();
                for (key, value) in map {
                    if SYSTEM_FIELDS.contains(&key.as_str()) {
                        tracing::debug!("Ignoring system field '{}' in API input", key);
                        continue;
                    }
                    record.fields.insert(key, value);
                }
                Ok(record)
            }
            _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    /// Wrap a record loaded from the store (system fields allowed)
    pub fn from_stored(data: Map<String, Value>) -> Self {
        Self {
            original: Some(data.clone()),
            fields: data,
            modified_fields: HashSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set field value with automatic change tracking
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();

        if SYSTEM_FIELDS.contains(&key.as_str()) {
            tracing::warn!("Attempted to set system field '{}' - ignoring", key);
            return self;
        }

        self.set_system_field(key, value)
    }

    /// Set system field (collection internals only)
    pub fn set_system_field(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }
        self.fields.insert(key, value.into());
        self
    }

    /// Apply multiple changes at once
    pub fn apply_changes(&mut self, changes: Map<String, Value>) -> &mut Self {
        for (key, value) in changes {
            self.set(key, value);
        }
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn created_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CREATED_DATE)
    }

    pub fn updated_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp(UPDATED_DATE)
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Refresh updated_date
    pub fn touch_updated_date(&mut self, now: DateTime<Utc>) -> &mut Self {
        self.set_system_field(UPDATED_DATE, Value::String(now.to_rfc3339()))
    }

    /// Check if a specific field differs from the stored state
    pub fn changed(&self, key: &str) -> bool {
        match (&self.original, self.fields.get(key)) {
            (Some(original), Some(current)) => original.get(key) != Some(current),
            (Some(original), None) => original.contains_key(key),
            (None, Some(_)) => true,
            (None, None) => false,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.modified_fields.is_empty() || self.original.is_none()
    }

    pub fn original(&self) -> Option<&Map<String, Value>> {
        self.original.as_ref()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.fields.clone()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.fields)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Record(id: {:?}, fields: {}, changed: {})",
            self.id(),
            self.fields.len(),
            self.has_changes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_input_drops_system_fields() {
        let record = Record::from_api_input(json!({
            "id": "abc",
            "created_date": "2020-01-01T00:00:00Z",
            "title": "x"
        }))
        .unwrap();
        assert!(record.id().is_none());
        assert!(record.get("created_date").is_none());
        assert_eq!(record.get("title"), Some(&json!("x")));
    }

    #[test]
    fn test_api_input_requires_object() {
        assert!(matches!(Record::from_api_input(json!([1, 2])), Err(RecordError::InvalidJson(_))));
    }

    #[test]
    fn test_change_tracking() {
        let stored = json!({ "id": "1", "title": "old", "done": false });
        let mut record = Record::from_stored(stored.as_object().cloned().unwrap());
        assert!(!record.has_changes());

        record.set("title", "new").set("id", "2");
        assert!(record.changed("title"));
        assert!(!record.changed("done"));
        assert_eq!(record.id(), Some("1"));
        assert!(record.has_changes());
    }

    #[test]
    fn test_touch_updated_date() {
        let mut record = Record::new();
        let now = Utc::now();
        record.touch_updated_date(now);
        assert_eq!(record.updated_date().map(|d| d.timestamp()), Some(now.timestamp()));
    }
}
