use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::record::ID_FIELD;
use super::store::{RecordStore, StoreError};
use crate::filter::Filter;

type Table = Vec<(String, Map<String, Value>)>;

/// Process-local store. Insertion order is kept and used as the natural order.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, kind: &str) -> usize {
        self.tables.read().await.get(kind).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn prepare(&self, kind: &str) -> Result<(), StoreError> {
        self.tables.write().await.entry(kind.to_string()).or_default();
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Map<String, Value>>, StoreError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(filter.table_name()) else {
            return Ok(vec![]);
        };
        Ok(filter.apply(table.iter().map(|(_, record)| record)))
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(kind)
            .and_then(|table| table.iter().find(|(key, _)| key == id))
            .map(|(_, record)| record.clone()))
    }

    async fn insert(&self, kind: &str, id: &str, mut record: Map<String, Value>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(kind.to_string()).or_default();
        if table.iter().any(|(key, _)| key == id) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        record.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        table.push((id.to_string(), record));
        Ok(())
    }

    async fn replace(&self, kind: &str, id: &str, mut record: Map<String, Value>) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables
            .get_mut(kind)
            .and_then(|table| table.iter_mut().find(|(key, _)| key == id))
        else {
            return Ok(false);
        };
        record.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        slot.1 = record;
        Ok(true)
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(kind) else {
            return Ok(false);
        };
        let before = table.len();
        table.retain(|(key, _)| key != id);
        Ok(table.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterData;
    use serde_json::json;

    fn filter(kind: &str, data: FilterData) -> Filter {
        Filter::from_data(kind, data).unwrap()
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let store = MemoryStore::new();
        store.insert("Task", "1", map(json!({ "title": "a" }))).await.unwrap();
        store.insert("Task", "2", map(json!({ "title": "b" }))).await.unwrap();
        assert_eq!(store.len("Task").await, 2);

        let found = store.get("Task", "1").await.unwrap().unwrap();
        assert_eq!(found["id"], "1");

        assert!(store.replace("Task", "1", map(json!({ "title": "z" }))).await.unwrap());
        assert!(!store.replace("Task", "9", map(json!({}))).await.unwrap());

        let sorted = store.find(&filter("Task", FilterData::default().with_order("-title"))).await.unwrap();
        assert_eq!(sorted[0]["title"], "z");

        assert!(store.delete("Task", "2").await.unwrap());
        assert!(!store.delete("Task", "2").await.unwrap());
        assert!(!store.delete("Project", "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryStore::new();
        store.insert("Task", "1", Map::new()).await.unwrap();
        let err = store.insert("Task", "1", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn test_find_on_unknown_kind_is_empty() {
        let store = MemoryStore::new();
        assert!(store.find(&filter("Nothing", FilterData::default())).await.unwrap().is_empty());
    }
}
