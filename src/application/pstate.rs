//! PState: the per-space projection view. Binds a root key, a space, a
//! storage adapter, two caches, and an optional schema for read-time
//! migration. See the Command Pipeline (`content_store`) for how events
//! get applied into a PState.

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::migration::{migrate_entity, DeferredWritePipeline};
use crate::application::schema_registry::SchemaRegistry;
use crate::config::CacheConfig;
use crate::domain::entities::value::{decode, encode};
use crate::domain::entities::Value;
use crate::domain::repositories::StorageAdapter;
use crate::domain::value_objects::SpaceId;
use crate::error::{EventSpaceError, Result};
use crate::infrastructure::persistence::DeferredWrite;

/// `get_resolved(key, depth)` with this depth never stops expanding on its
/// own account; only cycle detection bounds the recursion.
pub const INFINITE_DEPTH: u32 = u32::MAX;

/// One step of a dotted access path: `"card:c1.tags[0]"` parses to
/// `[Field("card:c1"), Field("tags"), Index(0)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep {
    Field(String),
    Index(usize),
}

fn parse_path(path: &str) -> Vec<PathStep> {
    let mut steps = Vec::new();
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        match segment.find('[') {
            None => steps.push(PathStep::Field(segment.to_string())),
            Some(bracket) => {
                let (name, rest) = segment.split_at(bracket);
                if !name.is_empty() {
                    steps.push(PathStep::Field(name.to_string()));
                }
                let mut rest = rest;
                while let Some(open) = rest.find('[') {
                    let Some(close) = rest[open..].find(']') else { break };
                    let index_str = &rest[open + 1..open + close];
                    if let Ok(index) = index_str.parse::<usize>() {
                        steps.push(PathStep::Index(index));
                    }
                    rest = &rest[open + close + 1..];
                }
            }
        }
    }
    steps
}

fn navigate<'a>(value: &'a Value, steps: &[PathStep]) -> Option<&'a Value> {
    let mut current = value;
    for step in steps {
        current = match (step, current) {
            (PathStep::Field(name), Value::Map(m)) => m.get(name)?,
            (PathStep::Index(i), Value::List(l)) => l.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_nested(value: &mut Value, steps: &[PathStep], new_value: Value) {
    let Some((head, rest)) = steps.split_first() else {
        *value = new_value;
        return;
    };
    match head {
        PathStep::Field(name) => {
            if !matches!(value, Value::Map(_)) {
                *value = Value::map();
            }
            let Value::Map(map) = value else { unreachable!() };
            let entry = map.entry(name.clone()).or_insert(Value::Null);
            set_nested(entry, rest, new_value);
        }
        PathStep::Index(index) => {
            if !matches!(value, Value::List(_)) {
                *value = Value::List(Vec::new());
            }
            let Value::List(list) = value else { unreachable!() };
            while list.len() <= *index {
                list.push(Value::Null);
            }
            set_nested(&mut list[*index], rest, new_value);
        }
    }
}

fn collect_ref_keys(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Ref(r) => out.push(r.key.as_str().to_string()),
        Value::List(items) => items.iter().for_each(|v| collect_ref_keys(v, out)),
        Value::Map(fields) => fields.values().for_each(|v| collect_ref_keys(v, out)),
        _ => {}
    }
}

/// Insert into a cache, evicting one arbitrary entry first if that would
/// exceed `capacity`. The caches are accelerators only (correctness never
/// depends on what they hold), so there is no need for real LRU tracking.
fn bounded_insert(cache: &DashMap<String, Value>, capacity: usize, key: String, value: Value) {
    if capacity > 0 && cache.len() >= capacity && !cache.contains_key(&key) {
        if let Some(evict) = cache.iter().next().map(|entry| entry.key().clone()) {
            cache.remove(&evict);
        }
    }
    cache.insert(key, value);
}

/// A handle bound to one space's projection. `fetch`/`put`/`delete` go
/// through the value cache and the adapter; `get_resolved` additionally
/// chases Refs through the ref-resolution cache. Entirely interior
/// mutable: every method takes `&self` so a `PState` can be shared behind
/// an `Arc` by the command pipeline without an outer lock.
pub struct PState {
    root_key: String,
    space_id: SpaceId,
    adapter: Arc<dyn StorageAdapter>,
    schema: Option<Arc<SchemaRegistry>>,
    deferred: Option<Arc<DeferredWritePipeline>>,
    cache_config: CacheConfig,
    value_cache: DashMap<String, Value>,
    ref_cache: DashMap<String, Value>,
}

impl PState {
    pub fn new(
        root_key: impl Into<String>,
        space_id: SpaceId,
        adapter: Arc<dyn StorageAdapter>,
        cache_config: CacheConfig,
        schema: Option<Arc<SchemaRegistry>>,
        deferred: Option<Arc<DeferredWritePipeline>>,
    ) -> Self {
        Self {
            root_key: root_key.into(),
            space_id,
            adapter,
            schema,
            deferred,
            cache_config,
            value_cache: DashMap::new(),
            ref_cache: DashMap::new(),
        }
    }

    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    /// Fetch the well-known root entity of this space.
    pub async fn root(&self) -> Result<Option<Value>> {
        let key = self.root_key.clone();
        self.fetch(&key).await
    }

    /// value cache -> adapter (migrating on the way through if a schema is
    /// registered for the key's entity type) -> cache populate -> return.
    pub async fn fetch(&self, key: &str) -> Result<Option<Value>> {
        if let Some(hit) = self.value_cache.get(key) {
            tracing::trace!(key, "value cache hit");
            return Ok(Some(hit.clone()));
        }

        let Some(raw) = self.adapter.get(self.space_id, key).await? else {
            return Ok(None);
        };
        let mut value = decode(&raw);

        if let Some(schema) = &self.schema {
            let entity_type = key.split(':').next().unwrap_or(key);
            if let Some(fields) = schema.schema_for(entity_type) {
                let (migrated, changed) = migrate_entity(value, &fields);
                value = migrated;
                if changed {
                    if let Some(deferred) = &self.deferred {
                        deferred.enqueue(DeferredWrite {
                            space_id: self.space_id,
                            key: key.to_string(),
                            value: encode(&value),
                        });
                    }
                }
            }
        }

        bounded_insert(&self.value_cache, self.cache_config.value_cache_capacity, key.to_string(), value.clone());
        Ok(Some(value))
    }

    /// Encode Refs, write through the adapter, update the value cache and
    /// fully clear the ref-resolution cache.
    pub async fn put(&self, key: &str, value: Value) -> Result<()> {
        let encoded = encode(&value);
        self.adapter.put(self.space_id, key, encoded).await?;
        bounded_insert(&self.value_cache, self.cache_config.value_cache_capacity, key.to_string(), value);
        self.ref_cache.clear();
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.adapter.delete(self.space_id, key).await?;
        self.value_cache.remove(key);
        self.ref_cache.clear();
        Ok(())
    }

    /// Read `key`, apply `mutator` to the (possibly absent) current value,
    /// then write the result back — or delete the key if `mutator`
    /// returns `None`. Returns the mutator's outcome.
    pub async fn get_and_update<F>(&self, key: &str, mutator: F) -> Result<Option<Value>>
    where
        F: FnOnce(Option<Value>) -> Option<Value>,
    {
        let current = self.fetch(key).await?;
        let outcome = mutator(current);
        match &outcome {
            Some(value) => self.put(key, value.clone()).await?,
            None => self.delete(key).await?,
        }
        Ok(outcome)
    }

    /// Eagerly substitute Ref fields with their resolved targets up to
    /// `depth` hops (`INFINITE_DEPTH` permitted). `depth == 0` returns the
    /// entity with Refs left in place. See the module-level cycle policy:
    /// a Ref pointing directly back to the entity currently being expanded
    /// raises [`EventSpaceError::ResolutionCycle`]; a Ref pointing to any
    /// more distant ancestor on the path is left unresolved instead.
    pub async fn get_resolved(&self, key: &str, depth: u32) -> Result<Option<Value>> {
        let cache_key = format!("{key}\u{0}{depth}");
        if let Some(hit) = self.ref_cache.get(&cache_key) {
            return Ok(Some(hit.clone()));
        }

        let Some(entity) = self.fetch(key).await? else {
            return Ok(None);
        };
        if depth == 0 {
            return Ok(Some(entity));
        }

        let mut visited = vec![key.to_string()];
        let resolved = self.walk(entity, depth, &mut visited).await?;
        bounded_insert(&self.ref_cache, self.cache_config.ref_cache_capacity, cache_key, resolved.clone());
        Ok(Some(resolved))
    }

    fn walk<'a>(&'a self, value: Value, remaining_depth: u32, visited: &'a mut Vec<String>) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            match value {
                Value::Map(fields) => {
                    let mut out = BTreeMap::new();
                    for (field_name, field_value) in fields {
                        out.insert(field_name, self.walk(field_value, remaining_depth, visited).await?);
                    }
                    Ok(Value::Map(out))
                }
                Value::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.walk(item, remaining_depth, visited).await?);
                    }
                    Ok(Value::List(out))
                }
                Value::Ref(r) => {
                    let target_key = r.key.as_str().to_string();

                    if visited.last().is_some_and(|current| current == &target_key) {
                        return Err(EventSpaceError::ResolutionCycle {
                            key: target_key,
                            path: visited.join(" -> "),
                        });
                    }
                    if visited.contains(&target_key) {
                        return Ok(Value::Ref(r));
                    }
                    if remaining_depth == 0 {
                        return Ok(Value::Ref(r));
                    }

                    match self.fetch(&target_key).await? {
                        None => Ok(Value::Ref(r)),
                        Some(target_value) => {
                            visited.push(target_key);
                            let resolved = self.walk(target_value, remaining_depth - 1, visited).await?;
                            visited.pop();
                            Ok(resolved)
                        }
                    }
                }
                other => Ok(other),
            }
        })
    }

    /// Bulk-materialize the entities referenced by `field_names` on `key`
    /// into the value cache via a single `multi_get`, to avoid N+1 lookups
    /// when a caller is about to read several of an entity's children.
    pub async fn preload(&self, key: &str, field_names: &[&str]) -> Result<()> {
        let Some(entity) = self.fetch(key).await? else {
            return Ok(());
        };
        let Some(map) = entity.as_map() else {
            return Ok(());
        };

        let mut ref_keys = Vec::new();
        for name in field_names {
            if let Some(field_value) = map.get(*name) {
                collect_ref_keys(field_value, &mut ref_keys);
            }
        }
        if ref_keys.is_empty() {
            return Ok(());
        }

        let fetched = self.adapter.multi_get(self.space_id, &ref_keys).await?;
        for (fetched_key, raw) in fetched {
            bounded_insert(&self.value_cache, self.cache_config.value_cache_capacity, fetched_key, decode(&raw));
        }
        Ok(())
    }

    /// Fetch by dotted path, e.g. `"card:c1.translations.t1"` or
    /// `"deck:d1.cards[0]"`. Returns `None` if any segment is absent.
    pub async fn get_path(&self, path: &str) -> Result<Option<Value>> {
        let mut steps = parse_path(path);
        if steps.is_empty() {
            return Ok(None);
        }
        let PathStep::Field(key) = steps.remove(0) else {
            return Ok(None);
        };
        let Some(root) = self.fetch(&key).await? else {
            return Ok(None);
        };
        Ok(navigate(&root, &steps).cloned())
    }

    /// Try each `|`-separated path in order, returning the first one that
    /// resolves to a present value, or `default` if none do.
    pub async fn get_path_with_fallback(&self, paths: &str, default: Value) -> Result<Value> {
        for candidate in paths.split('|') {
            if let Some(value) = self.get_path(candidate.trim()).await? {
                return Ok(value);
            }
        }
        Ok(default)
    }

    /// Write `new_value` at a dotted path, creating intermediate maps and
    /// lists as needed, then write the root entity back through `put`.
    pub async fn set_path(&self, path: &str, new_value: Value) -> Result<()> {
        let mut steps = parse_path(path);
        if steps.is_empty() {
            return Err(EventSpaceError::InvalidInput("empty path".to_string()));
        }
        let PathStep::Field(key) = steps.remove(0) else {
            return Err(EventSpaceError::InvalidInput(format!("path must start with a key: {path}")));
        };
        let mut root = self.fetch(&key).await?.unwrap_or_else(Value::map);
        set_nested(&mut root, &steps, new_value);
        self.put(&key, root).await
    }

    /// Encode a [`Value`] to the adapter's JSON wire format. Exposed for
    /// callers (e.g. event applicators) that build payloads directly.
    pub fn encode(value: &Value) -> Json {
        encode(value)
    }

    pub fn decode(json: &Json) -> Value {
        decode(json)
    }
}
