pub mod collection;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use collection::{Collection, CollectionError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use record::{Record, RecordError, ID_FIELD, SYSTEM_FIELDS};
pub use store::{RecordStore, StoreError};
