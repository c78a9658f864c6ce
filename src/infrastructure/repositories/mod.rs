pub mod memory_adapter;

#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;

pub use memory_adapter::InMemoryAdapter;

#[cfg(feature = "sqlite")]
pub use sqlite_adapter::SqliteAdapter;
