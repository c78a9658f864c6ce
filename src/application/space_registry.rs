//! Space lifecycle: create-or-find by name, look up by id, list, delete
//! with cascade.

use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

use crate::domain::entities::Space;
use crate::domain::repositories::StorageAdapter;
use crate::domain::value_objects::{SpaceId, SpaceName};
use crate::error::{EventSpaceError, Result};

fn name_key(name: &str) -> String {
    format!("space:{name}")
}

fn id_key(space_id: SpaceId) -> String {
    format!("space_id:{}", space_id.value())
}

/// Stores space records in the reserved `SpaceId::REGISTRY` partition of
/// whatever adapter the event log and projections also use, rather than
/// requiring a side-channel store.
pub struct SpaceRegistry {
    adapter: Arc<dyn StorageAdapter>,
    next_id: AtomicU64,
    // Serializes get_or_create / delete so two racing creates of the same
    // name can't both win and assign distinct ids.
    write_lock: AsyncMutex<()>,
}

impl SpaceRegistry {
    pub fn new(adapter: Arc<dyn StorageAdapter>) -> Self {
        Self {
            adapter,
            next_id: AtomicU64::new(1),
            write_lock: AsyncMutex::new(()),
        }
    }

    /// Restore `next_id` from durable storage after a restart.
    pub async fn recover(&self) -> Result<()> {
        let entries = self.adapter.scan(SpaceId::REGISTRY, "space_id:").await?;
        let max_id = entries
            .iter()
            .filter_map(|(key, _)| key.strip_prefix("space_id:"))
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id.store(max_id + 1, Ordering::SeqCst);
        Ok(())
    }

    pub async fn exists(&self, space_id: SpaceId) -> Result<bool> {
        Ok(self.adapter.get(SpaceId::REGISTRY, &id_key(space_id)).await?.is_some())
    }

    pub async fn find_by_id(&self, space_id: SpaceId) -> Result<Option<Space>> {
        match self.adapter.get(SpaceId::REGISTRY, &id_key(space_id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Space>> {
        let Some(id_value) = self.adapter.get(SpaceId::REGISTRY, &name_key(name)).await? else {
            return Ok(None);
        };
        let space_id = SpaceId::new(id_value.as_u64().ok_or_else(|| {
            EventSpaceError::Corruption(format!("space name index entry for '{name}' is not an integer"))
        })?);
        self.find_by_id(space_id).await
    }

    pub async fn list(&self) -> Result<Vec<Space>> {
        let entries = self.adapter.scan(SpaceId::REGISTRY, "space_id:").await?;
        entries
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value).map_err(EventSpaceError::from))
            .collect()
    }

    /// Idempotent: if a space named `name` already exists, its existing
    /// record is returned unchanged — `metadata` is only applied on first
    /// creation (see the open question on metadata updates in DESIGN.md).
    pub async fn get_or_create(&self, name: &str, metadata: Option<HashMap<String, serde_json::Value>>) -> Result<Space> {
        let space_name = SpaceName::new(name)?;

        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.find_by_name(space_name.as_str()).await? {
            return Ok(existing);
        }

        let space_id = SpaceId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let space = Space::new(space_id, space_name.clone(), metadata.unwrap_or_default());

        self.adapter
            .multi_put(
                SpaceId::REGISTRY,
                vec![
                    (name_key(space_name.as_str()), json!(space_id.value())),
                    (id_key(space_id), serde_json::to_value(&space)?),
                ],
            )
            .await?;

        tracing::info!(space_id = space_id.value(), name = %space_name, "space created");
        Ok(space)
    }

    /// Remove the space record and sweep every event, projection and
    /// checkpoint entry tagged with `space_id`.
    pub async fn delete(&self, space_id: SpaceId) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let Some(space) = self.find_by_id(space_id).await? else {
            return Err(EventSpaceError::SpaceNotFound(space_id.to_string()));
        };

        self.adapter.delete(SpaceId::REGISTRY, &name_key(space.space_name.as_str())).await?;
        self.adapter.delete(SpaceId::REGISTRY, &id_key(space_id)).await?;
        self.adapter.delete_space(space_id).await?;

        tracing::info!(space_id = space_id.value(), "space deleted");
        Ok(())
    }
}
