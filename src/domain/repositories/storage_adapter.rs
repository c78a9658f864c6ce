use async_trait::async_trait;
use serde_json::Value as Json;
use std::collections::HashMap;

use crate::domain::value_objects::SpaceId;
use crate::error::Result;

/// The narrow capability set shared by the event log, the space registry
/// and PState: a space-partitioned key/value store. Event log and
/// projection both consume the same abstraction, so a single adapter
/// instance (in-memory or durable) can back both.
///
/// Implementors must make `multi_put` atomic for durable backends (all
/// writes commit or none do); `scan` order is unspecified but must be
/// deterministic for a fixed adapter state; values are opaque JSON and
/// must round-trip exactly, including `$ref`-tagged records (see
/// [`crate::domain::entities::value`]).
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get(&self, space_id: SpaceId, key: &str) -> Result<Option<Json>>;

    async fn put(&self, space_id: SpaceId, key: &str, value: Json) -> Result<()>;

    async fn delete(&self, space_id: SpaceId, key: &str) -> Result<()>;

    /// All `(key, value)` pairs in `space_id` whose key starts with `prefix`.
    async fn scan(&self, space_id: SpaceId, prefix: &str) -> Result<Vec<(String, Json)>>;

    async fn multi_get(&self, space_id: SpaceId, keys: &[String]) -> Result<HashMap<String, Json>>;

    /// Atomic (for durable backends) batched write. Last-write-wins for
    /// duplicate keys within the same call.
    async fn multi_put(&self, space_id: SpaceId, entries: Vec<(String, Json)>) -> Result<()>;

    /// Remove every entry belonging to `space_id`. Used by space deletion
    /// cascades; adapters may implement this more efficiently than
    /// `scan` + per-key `delete`.
    async fn delete_space(&self, space_id: SpaceId) -> Result<()>;
}
