//! The command pipeline: validates via a pure command function, appends the
//! resulting events, applies them to PState, and offers rebuild/catch-up to
//! keep a space's projection consistent with its event log.

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value as Json;
use std::sync::Arc;

use crate::application::event_log::EventLog;
use crate::application::migration::DeferredWritePipeline;
use crate::application::pstate::PState;
use crate::application::schema_registry::SchemaRegistry;
use crate::config::CacheConfig;
use crate::domain::entities::EventRecord;
use crate::domain::repositories::StorageAdapter;
use crate::domain::value_objects::SpaceId;
use crate::error::{EventSpaceError, Result};

fn checkpoint_key(space_id: SpaceId) -> String {
    format!("checkpoint:{}", space_id.value())
}

/// A pure command: reads `pstate` (which may resolve Refs and trigger
/// migration along the way), decides on zero or more events, and returns
/// them as `(event_type, payload)` pairs. Never mutates PState directly —
/// the pipeline does that by applying the resulting events.
pub type CommandFn = Arc<dyn Fn(Arc<PState>, Json) -> BoxFuture<'static, Result<Vec<(String, Json)>>> + Send + Sync>;

/// Derives the entity an event payload pertains to. Returning `None` falls
/// back to the store's root key.
pub type EntityIdExtractor = Arc<dyn Fn(&Json) -> Option<String> + Send + Sync>;

/// Mutates a PState in response to one persisted event. Must be
/// deterministic for a given prior PState and event, and must silently
/// ignore unknown `event_type` values rather than erroring, so that old
/// projections stay replayable against newer event streams.
#[async_trait]
pub trait EventApplicator: Send + Sync {
    async fn apply(&self, pstate: &PState, event: &EventRecord) -> Result<()>;
}

/// Fold `apply` over `events` in order.
pub async fn apply_events(applicator: &dyn EventApplicator, pstate: &PState, events: &[EventRecord]) -> Result<()> {
    for event in events {
        applicator.apply(pstate, event).await?;
    }
    Ok(())
}

/// The result of a successful [`ContentStore::execute`]: the ids of the
/// events appended, and the PState handle that observes their effects.
/// Reads through an older handle obtained before this call may not.
pub struct ExecuteOutcome {
    pub event_ids: Vec<u64>,
    pub pstate: Arc<PState>,
}

/// Binds one Event Log, one PState, one applicator and one entity-id
/// extractor to a single space. This is the unit of command execution;
/// a host typically keeps one `ContentStore` per open space.
pub struct ContentStore {
    space_id: SpaceId,
    event_log: Arc<EventLog>,
    adapter: Arc<dyn StorageAdapter>,
    pstate: RwLock<Arc<PState>>,
    applicator: Arc<dyn EventApplicator>,
    extractor: EntityIdExtractor,
    root_key: String,
    cache_config: CacheConfig,
    schema: Option<Arc<SchemaRegistry>>,
    deferred: Option<Arc<DeferredWritePipeline>>,
}

impl ContentStore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        space_id: SpaceId,
        event_log: Arc<EventLog>,
        adapter: Arc<dyn StorageAdapter>,
        root_key: impl Into<String>,
        cache_config: CacheConfig,
        schema: Option<Arc<SchemaRegistry>>,
        deferred: Option<Arc<DeferredWritePipeline>>,
        applicator: Arc<dyn EventApplicator>,
        extractor: EntityIdExtractor,
    ) -> Self {
        let root_key = root_key.into();
        let pstate = Arc::new(PState::new(
            root_key.clone(),
            space_id,
            adapter.clone(),
            cache_config.clone(),
            schema.clone(),
            deferred.clone(),
        ));
        Self {
            space_id,
            event_log,
            adapter,
            pstate: RwLock::new(pstate),
            applicator,
            extractor,
            root_key,
            cache_config,
            schema,
            deferred,
        }
    }

    /// The PState handle current as of the last `execute`/`rebuild_pstate`/
    /// `catchup_pstate` call on this store. Cloning an `Arc` is cheap; hold
    /// onto the clone returned by `execute` for read-your-writes.
    pub fn pstate(&self) -> Arc<PState> {
        self.pstate.read().clone()
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    async fn read_checkpoint(&self) -> Result<u64> {
        match self.adapter.get(self.space_id, &checkpoint_key(self.space_id)).await? {
            Some(value) => Ok(value.as_u64().unwrap_or(0)),
            None => Ok(0),
        }
    }

    async fn write_checkpoint(&self, space_sequence: u64) -> Result<()> {
        self.adapter
            .put(self.space_id, &checkpoint_key(self.space_id), serde_json::json!(space_sequence))
            .await
    }

    /// Run `command_fn` against the current PState. On `Err`, returns the
    /// error unchanged with no events appended and no projection change. On
    /// `Ok`, appends and applies each resulting event in order, then
    /// advances the checkpoint to the last applied `space_sequence`.
    pub async fn execute(&self, command_fn: &CommandFn, params: Json) -> Result<ExecuteOutcome> {
        let pstate = self.pstate();
        let commands = command_fn(pstate.clone(), params).await?;

        let mut event_ids = Vec::with_capacity(commands.len());
        let mut last_sequence = None;

        for (event_type, payload) in commands {
            let entity_id = (self.extractor)(&payload).unwrap_or_else(|| pstate.root_key().to_string());
            let (event_id, space_sequence) = self.event_log.append(self.space_id, entity_id, event_type, payload).await?;

            let event = self
                .event_log
                .get_event(event_id)
                .await?
                .ok_or_else(|| EventSpaceError::Corruption(format!("just-appended event {event_id} is missing")))?;

            self.applicator.apply(&pstate, &event).await?;

            event_ids.push(event_id);
            last_sequence = Some(space_sequence);
        }

        if let Some(space_sequence) = last_sequence {
            self.write_checkpoint(space_sequence).await?;
        }

        Ok(ExecuteOutcome { event_ids, pstate })
    }

    /// Replace this store's PState with a fresh one built by replaying
    /// every event in this space from the beginning, in batches of
    /// `batch_size` (defaults to replaying everything in one batch). Other
    /// spaces are untouched.
    pub async fn rebuild_pstate(&self, batch_size: Option<usize>) -> Result<()> {
        let fresh = Arc::new(PState::new(
            self.root_key.clone(),
            self.space_id,
            self.adapter.clone(),
            self.cache_config.clone(),
            self.schema.clone(),
            self.deferred.clone(),
        ));

        let events = self.event_log.stream_space_events(self.space_id, 0).await?;
        let batch_size = batch_size.unwrap_or(events.len().max(1));

        for batch in events.chunks(batch_size) {
            apply_events(self.applicator.as_ref(), &fresh, batch).await?;
        }

        if let Some(last) = events.last() {
            self.write_checkpoint(last.space_sequence).await?;
        }

        *self.pstate.write() = fresh;
        Ok(())
    }

    /// Apply every event after `from_sequence` up to the space's current
    /// high-water mark to the *current* PState handle, advance the
    /// checkpoint, and return the number of events applied.
    pub async fn catchup_pstate(&self, from_sequence: u64) -> Result<usize> {
        let pstate = self.pstate();
        let events = self.event_log.stream_space_events(self.space_id, from_sequence).await?;

        apply_events(self.applicator.as_ref(), &pstate, &events).await?;

        if let Some(last) = events.last() {
            self.write_checkpoint(last.space_sequence).await?;
        }

        Ok(events.len())
    }

    pub async fn checkpoint(&self) -> Result<u64> {
        self.read_checkpoint().await
    }
}
