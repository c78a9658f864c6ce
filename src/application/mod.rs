pub mod content_store;
pub mod event_log;
pub mod migration;
pub mod pstate;
pub mod schema_registry;
pub mod space_registry;

pub use content_store::{apply_events, CommandFn, ContentStore, EntityIdExtractor, EventApplicator, ExecuteOutcome};
pub use event_log::EventLog;
pub use migration::{migrate_entity, needs_migration, DeferredWritePipeline};
pub use pstate::{PState, INFINITE_DEPTH};
pub use schema_registry::SchemaRegistry;
pub use space_registry::SpaceRegistry;
