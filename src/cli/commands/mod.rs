pub mod check;
pub mod describe;
pub mod kinds;

use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::database::MemoryStore;
use crate::registry::{Registry, RegistryBuilder};

/// Build the registry from the configured directory. The CLI never touches
/// stored records, so an in-memory store is enough.
pub(crate) fn build_registry(config: RegistryConfig) -> Registry {
    RegistryBuilder::new(config, Arc::new(MemoryStore::new())).discover().build()
}
