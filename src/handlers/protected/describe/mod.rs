pub mod schema;

pub use schema::{schema_get, schema_list};
