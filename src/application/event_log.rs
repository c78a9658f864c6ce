//! Space-partitioned, append-only event log with per-space sequences and a
//! process-wide monotonic `event_id`.

use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

use crate::application::space_registry::SpaceRegistry;
use crate::domain::entities::EventRecord;
use crate::domain::repositories::StorageAdapter;
use crate::domain::value_objects::{EntityId, SpaceId};
use crate::error::{EventSpaceError, Result};

const HWM_KEY: &str = "hwm";

fn event_key(event_id: u64) -> String {
    format!("event:{event_id}")
}

fn entity_index_key(entity_id: &str, space_sequence: u64) -> String {
    format!("entity:{entity_id}:{space_sequence}")
}

fn seq_index_key(space_sequence: u64) -> String {
    format!("seq:{space_sequence}")
}

/// Appends events to, and reads events back from, a single logical event
/// stream per space. See the Event Log component of the system design for
/// the collections this maintains and their ordering guarantees.
pub struct EventLog {
    adapter: Arc<dyn StorageAdapter>,
    spaces: Arc<SpaceRegistry>,
    global_counter: AtomicU64,
    append_locks: DashMap<SpaceId, Arc<AsyncMutex<()>>>,
    /// In-memory cross-space entity index: entity_id -> [(space_id, event_id)].
    /// Not persisted directly; rebuilt by [`EventLog::recover`] from the
    /// per-space entity index collection so a process restart doesn't lose
    /// the ability to answer `get_events(entity_id)` across spaces.
    entity_index: DashMap<String, Vec<(SpaceId, u64)>>,
    event_location: DashMap<u64, SpaceId>,
}

impl EventLog {
    pub fn new(adapter: Arc<dyn StorageAdapter>, spaces: Arc<SpaceRegistry>) -> Self {
        Self {
            adapter,
            spaces,
            global_counter: AtomicU64::new(0),
            append_locks: DashMap::new(),
            entity_index: DashMap::new(),
            event_location: DashMap::new(),
        }
    }

    fn lock_for(&self, space_id: SpaceId) -> Arc<AsyncMutex<()>> {
        self.append_locks
            .entry(space_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Rebuild the in-memory global counter and cross-space entity index
    /// from durable storage. Call once after opening a durable adapter,
    /// passing every currently-registered space.
    pub async fn recover(&self, space_ids: &[SpaceId]) -> Result<()> {
        let mut max_event_id = 0u64;
        for &space_id in space_ids {
            let entries = self.adapter.scan(space_id, "seq:").await?;
            for (_, value) in entries {
                let event_id = value.as_u64().ok_or_else(|| {
                    EventSpaceError::Corruption("sequence index entry is not an integer".to_string())
                })?;
                max_event_id = max_event_id.max(event_id);
                self.event_location.insert(event_id, space_id);
            }

            let entity_entries = self.adapter.scan(space_id, "entity:").await?;
            for (key, value) in entity_entries {
                let event_id = value.as_u64().ok_or_else(|| {
                    EventSpaceError::Corruption("entity index entry is not an integer".to_string())
                })?;
                // key shape: "entity:<entity_id>:<space_sequence>"
                let entity_id = key
                    .strip_prefix("entity:")
                    .and_then(|rest| rest.rsplit_once(':'))
                    .map(|(id, _)| id.to_string())
                    .ok_or_else(|| EventSpaceError::Corruption(format!("malformed entity index key '{key}'")))?;
                self.entity_index.entry(entity_id).or_default().push((space_id, event_id));
            }
        }
        self.global_counter.store(max_event_id, Ordering::SeqCst);
        Ok(())
    }

    /// Append one event to `space_id`. Atomic: either all four collection
    /// writes and the counter advances, or nothing changes. `entity_id`
    /// accepts anything that converts to an [`EntityId`] (e.g. `&str`),
    /// propagating the value object's validation error.
    pub async fn append<E>(
        &self,
        space_id: SpaceId,
        entity_id: E,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<(u64, u64)>
    where
        E: TryInto<EntityId, Error = EventSpaceError>,
    {
        if !self.spaces.exists(space_id).await? {
            return Err(EventSpaceError::SpaceNotFound(space_id.to_string()));
        }

        let entity_id = entity_id.try_into()?;

        let lock = self.lock_for(space_id);
        let _guard = lock.lock().await;

        let space_sequence = self.get_space_latest_sequence(space_id).await? + 1;
        let event_id = self.global_counter.fetch_add(1, Ordering::SeqCst) + 1;

        let record = EventRecord::new(event_id, space_id, space_sequence, entity_id.clone(), event_type.into(), payload);
        let serialized = serde_json::to_value(&record)?;

        let entries = vec![
            (event_key(event_id), serialized),
            (entity_index_key(entity_id.as_str(), space_sequence), json!(event_id)),
            (seq_index_key(space_sequence), json!(event_id)),
            (HWM_KEY.to_string(), json!(space_sequence)),
        ];

        self.adapter.multi_put(space_id, entries).await?;

        self.event_location.insert(event_id, space_id);
        self.entity_index.entry(entity_id.into_inner()).or_default().push((space_id, event_id));

        tracing::debug!(event_id, space_sequence, space_id = space_id.value(), "event appended");
        Ok((event_id, space_sequence))
    }

    pub async fn get_event(&self, event_id: u64) -> Result<Option<EventRecord>> {
        let Some(space_id) = self.event_location.get(&event_id).map(|v| *v) else {
            return Ok(None);
        };
        match self.adapter.get(space_id, &event_key(event_id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// All events for `entity_id` across every space, ordered by `event_id`.
    pub async fn get_events(&self, entity_id: &str) -> Result<Vec<EventRecord>> {
        let locations = match self.entity_index.get(entity_id) {
            Some(list) => list.clone(),
            None => return Ok(Vec::new()),
        };
        let mut event_ids: Vec<u64> = locations.into_iter().map(|(_, event_id)| event_id).collect();
        event_ids.sort_unstable();

        let mut events = Vec::with_capacity(event_ids.len());
        for event_id in event_ids {
            if let Some(event) = self.get_event(event_id).await? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Events for `space_id` in `space_sequence` order, starting just after
    /// `from_sequence` (pass 0 to read from the beginning).
    pub async fn stream_space_events(&self, space_id: SpaceId, from_sequence: u64) -> Result<Vec<EventRecord>> {
        let entries = self.adapter.scan(space_id, "seq:").await?;
        let mut by_sequence: Vec<(u64, u64)> = entries
            .into_iter()
            .filter_map(|(key, value)| {
                let sequence: u64 = key.strip_prefix("seq:")?.parse().ok()?;
                let event_id = value.as_u64()?;
                Some((sequence, event_id))
            })
            .filter(|(sequence, _)| *sequence > from_sequence)
            .collect();
        by_sequence.sort_unstable_by_key(|(sequence, _)| *sequence);

        let mut events = Vec::with_capacity(by_sequence.len());
        for (_, event_id) in by_sequence {
            match self.adapter.get(space_id, &event_key(event_id)).await? {
                Some(value) => events.push(serde_json::from_value(value)?),
                None => {
                    return Err(EventSpaceError::Corruption(format!(
                        "sequence index references missing event {event_id}"
                    )))
                }
            }
        }
        Ok(events)
    }

    pub async fn get_space_latest_sequence(&self, space_id: SpaceId) -> Result<u64> {
        match self.adapter.get(space_id, HWM_KEY).await? {
            Some(value) => Ok(value.as_u64().unwrap_or(0)),
            None => Ok(0),
        }
    }
}
