use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as Json;
use std::collections::HashMap;

use crate::domain::repositories::StorageAdapter;
use crate::domain::value_objects::SpaceId;
use crate::error::Result;

/// In-process, non-durable [`StorageAdapter`] backed by a nested
/// `DashMap`: one lock-free shard per space, and inside it a lock-free
/// shard per key. Mirrors the concurrency style of the teacher lineage's
/// in-memory repository implementations — entry-level locking rather
/// than one global `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryAdapter {
    spaces: DashMap<SpaceId, DashMap<String, Json>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageAdapter for InMemoryAdapter {
    async fn get(&self, space_id: SpaceId, key: &str) -> Result<Option<Json>> {
        Ok(self
            .spaces
            .get(&space_id)
            .and_then(|space| space.get(key).map(|v| v.clone())))
    }

    async fn put(&self, space_id: SpaceId, key: &str, value: Json) -> Result<()> {
        self.spaces
            .entry(space_id)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, space_id: SpaceId, key: &str) -> Result<()> {
        if let Some(space) = self.spaces.get(&space_id) {
            space.remove(key);
        }
        Ok(())
    }

    async fn scan(&self, space_id: SpaceId, prefix: &str) -> Result<Vec<(String, Json)>> {
        let mut matches: Vec<(String, Json)> = match self.spaces.get(&space_id) {
            Some(space) => space
                .iter()
                .filter(|entry| entry.key().starts_with(prefix))
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            None => Vec::new(),
        };
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matches)
    }

    async fn multi_get(&self, space_id: SpaceId, keys: &[String]) -> Result<HashMap<String, Json>> {
        let mut out = HashMap::new();
        if let Some(space) = self.spaces.get(&space_id) {
            for key in keys {
                if let Some(value) = space.get(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(out)
    }

    async fn multi_put(&self, space_id: SpaceId, entries: Vec<(String, Json)>) -> Result<()> {
        let space = self.spaces.entry(space_id).or_default();
        for (key, value) in entries {
            space.insert(key, value);
        }
        Ok(())
    }

    async fn delete_space(&self, space_id: SpaceId) -> Result<()> {
        self.spaces.remove(&space_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let adapter = InMemoryAdapter::new();
        let space = SpaceId::new(1);
        adapter.put(space, "entity:e1", json!({"name": "N1"})).await.unwrap();
        let value = adapter.get(space, "entity:e1").await.unwrap();
        assert_eq!(value, Some(json!({"name": "N1"})));
    }

    #[tokio::test]
    async fn get_on_unknown_space_is_absent_not_error() {
        let adapter = InMemoryAdapter::new();
        let value = adapter.get(SpaceId::new(99), "anything").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn scan_filters_by_prefix_and_space() {
        let adapter = InMemoryAdapter::new();
        let a = SpaceId::new(1);
        let b = SpaceId::new(2);
        adapter.put(a, "card:c1", json!(1)).await.unwrap();
        adapter.put(a, "card:c2", json!(2)).await.unwrap();
        adapter.put(a, "deck:d1", json!(3)).await.unwrap();
        adapter.put(b, "card:c1", json!(4)).await.unwrap();

        let results = adapter.scan(a, "card:").await.unwrap();
        assert_eq!(results, vec![("card:c1".to_string(), json!(1)), ("card:c2".to_string(), json!(2))]);
    }

    #[tokio::test]
    async fn multi_put_then_multi_get() {
        let adapter = InMemoryAdapter::new();
        let space = SpaceId::new(1);
        adapter
            .multi_put(space, vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))])
            .await
            .unwrap();
        let fetched = adapter
            .multi_get(space, &["a".to_string(), "b".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched["a"], json!(1));
    }

    #[tokio::test]
    async fn delete_space_removes_all_its_entries() {
        let adapter = InMemoryAdapter::new();
        let a = SpaceId::new(1);
        let b = SpaceId::new(2);
        adapter.put(a, "k", json!(1)).await.unwrap();
        adapter.put(b, "k", json!(2)).await.unwrap();

        adapter.delete_space(a).await.unwrap();

        assert_eq!(adapter.get(a, "k").await.unwrap(), None);
        assert_eq!(adapter.get(b, "k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let adapter = InMemoryAdapter::new();
        let space = SpaceId::new(1);
        adapter.delete(space, "missing").await.unwrap();
        adapter.put(space, "k", json!(1)).await.unwrap();
        adapter.delete(space, "k").await.unwrap();
        adapter.delete(space, "k").await.unwrap();
        assert_eq!(adapter.get(space, "k").await.unwrap(), None);
    }
}
