use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;

use crate::domain::value_objects::{SpaceId, SpaceName};

/// A named, isolated event stream + projection. Created on first
/// `get_or_create`, deleted explicitly; deletion cascades to every event,
/// projection entry and checkpoint tagged with the space's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub space_id: SpaceId,
    pub space_name: SpaceName,
    pub metadata: HashMap<String, Json>,
    pub created_at: DateTime<Utc>,
}

impl Space {
    pub fn new(space_id: SpaceId, space_name: SpaceName, metadata: HashMap<String, Json>) -> Self {
        Self {
            space_id,
            space_name,
            metadata,
            created_at: Utc::now(),
        }
    }
}
