//! SQLite persistence for the hushcalc key space.

pub mod schema;
pub mod sqlite_key_value_store;

pub use sqlite_key_value_store::SqliteKeyValueStore;
