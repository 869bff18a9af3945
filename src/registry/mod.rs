//! Process-wide map from entity kind name to its collection handle.
//!
//! Built once at startup by [`RegistryBuilder`] and read-only afterwards, so
//! lookups need no locking. The reserved account kind is always present.

pub mod builder;
pub mod loader;

use std::collections::HashMap;
use std::sync::Arc;

use crate::database::{Collection, RecordStore, StoreError};

pub use builder::{BuildFailure, BuildReport, Collision, FailureStage, RegistryBuilder};
pub use loader::{discover, DefinitionSource, SourceBody};

#[derive(Debug)]
pub struct Registry {
    collections: HashMap<String, Arc<Collection>>,
    reserved_kind: String,
    store: Arc<dyn RecordStore>,
    report: BuildReport,
}

impl Registry {
    pub(crate) fn from_parts(
        collections: HashMap<String, Arc<Collection>>,
        reserved_kind: String,
        store: Arc<dyn RecordStore>,
        report: BuildReport,
    ) -> Self {
        Self { collections, reserved_kind, store, report }
    }

    /// Collection handle for `kind`, or `None` for unknown kinds
    pub fn resolve(&self, kind: &str) -> Option<Arc<Collection>> {
        self.collections.get(kind).cloned()
    }

    /// The account collection the authentication handlers depend on
    pub fn accounts(&self) -> Option<Arc<Collection>> {
        self.resolve(&self.reserved_kind)
    }

    pub fn account_kind(&self) -> &str {
        &self.reserved_kind
    }

    /// Registered kind names, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Ask the store to prepare backing storage for every registered kind
    pub async fn prepare_storage(&self) -> Result<(), StoreError> {
        for kind in self.kinds() {
            self.store.prepare(kind).await?;
        }
        Ok(())
    }
}
