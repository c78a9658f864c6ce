//! Embeddable event-sourced projection engine with multi-tenant space
//! isolation.
//!
//! A host creates named **spaces**, each an independent event stream with
//! its own projection (`PState`). Commands run against a `ContentStore`:
//! they read the projection, decide on events, and the pipeline appends
//! those events to the space's `EventLog` and applies them back into
//! `PState`. Entities may hold `Ref`s to other entities, resolved lazily by
//! `PState::get_resolved`; a `SchemaRegistry` drives read-time migration of
//! legacy field shapes with best-effort deferred write-back.
//!
//! ```no_run
//! use eventspace_core::{InMemoryAdapter, SpaceRegistry, StorageAdapter};
//! use std::sync::Arc;
//!
//! # async fn example() -> eventspace_core::Result<()> {
//! let adapter: Arc<dyn StorageAdapter> = Arc::new(InMemoryAdapter::new());
//! let spaces = SpaceRegistry::new(adapter);
//! let space = spaces.get_or_create("demo", None).await?;
//! println!("created space {}", space.space_id);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use config::{CacheConfig, Config, DeferredWriteConfig};
pub use error::{EventSpaceError, Result};

pub use application::{
    apply_events, migrate_entity, needs_migration, CommandFn, ContentStore, DeferredWritePipeline, EntityIdExtractor, EventApplicator,
    EventLog, ExecuteOutcome, PState, SchemaRegistry, SpaceRegistry, INFINITE_DEPTH,
};

pub use domain::entities::{decode, encode, EntitySchema, EventRecord, Field, FieldType, Ref, Space, Value, REF_TAG};
pub use domain::repositories::StorageAdapter;
pub use domain::value_objects::{EntityId, RefKey, SpaceId, SpaceName};

pub use infrastructure::persistence::{DeferredWrite, DeferredWriteQueue};
pub use infrastructure::repositories::InMemoryAdapter;

#[cfg(feature = "sqlite")]
pub use infrastructure::repositories::SqliteAdapter;
