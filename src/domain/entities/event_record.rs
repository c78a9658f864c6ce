use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::domain::value_objects::{EntityId, SpaceId};

/// A single immutable fact appended to the event log.
///
/// `event_id` is a process-wide monotonic counter that orders events across
/// every space in real append order; `space_sequence` is a per-space
/// counter starting at 1 that orders events within one space and has no
/// gaps. `entity_id` is derived by an application-supplied extractor over
/// `payload` at append time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub event_id: u64,
    pub space_id: SpaceId,
    pub space_sequence: u64,
    pub entity_id: EntityId,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Json,
}

impl EventRecord {
    pub fn new(
        event_id: u64,
        space_id: SpaceId,
        space_sequence: u64,
        entity_id: EntityId,
        event_type: String,
        payload: Json,
    ) -> Self {
        Self {
            event_id,
            space_id,
            space_sequence,
            entity_id,
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn is_type(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}
