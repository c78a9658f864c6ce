//! Field-level migration: type-based detection, per-entity migration, and
//! the background deferred-write actor that persists migrated shapes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::DeferredWriteConfig;
use crate::domain::entities::{EntitySchema, Value};
use crate::domain::repositories::StorageAdapter;
use crate::domain::value_objects::SpaceId;
use crate::error::Result;
use crate::infrastructure::persistence::{DeferredWrite, DeferredWriteQueue};

/// `true` if `value` no longer matches `field`'s declared shape and should
/// be rewritten by `field.migrate_fn`. `null` is universally compatible and
/// a field with no migration function is never considered stale.
pub fn needs_migration(value: &Value, field: &crate::domain::entities::Field) -> bool {
    if field.migrate_fn.is_none() {
        return false;
    }
    if value.is_null() {
        return false;
    }
    !field.field_type.matches(value)
}

/// Apply every field's migration in declaration order to an entity value.
/// Pure and idempotent when the migration functions themselves are
/// idempotent on their output shape. Returns the (possibly unchanged)
/// value and whether anything changed.
pub fn migrate_entity(value: Value, fields: &EntitySchema) -> (Value, bool) {
    let Value::Map(mut map) = value else {
        return (value, false);
    };

    let mut changed = false;
    for field in fields {
        if let Some(current) = map.get(&field.name) {
            if needs_migration(current, field) {
                let migrate_fn = field.migrate_fn.as_ref().expect("checked by needs_migration");
                let current = map.remove(&field.name).expect("key just checked present");
                map.insert(field.name.clone(), migrate_fn(current));
                changed = true;
            }
        }
    }

    (Value::Map(map), changed)
}

/// Background actor that batches `(space_id, key, migrated value)`
/// write-backs and commits them via the adapter's `multi_put`. Writes are
/// best-effort: a lost or failed write-back is harmless because the next
/// read re-migrates and re-enqueues the same value.
pub struct DeferredWritePipeline {
    queue: DeferredWriteQueue,
    adapter: Arc<dyn StorageAdapter>,
    shutdown: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DeferredWritePipeline {
    pub fn spawn(adapter: Arc<dyn StorageAdapter>, config: DeferredWriteConfig) -> Self {
        let queue = DeferredWriteQueue::new(config.queue_capacity);
        let shutdown = Arc::new(Notify::new());
        let stopped = Arc::new(AtomicBool::new(false));

        let loop_queue = queue.clone();
        let loop_adapter = adapter.clone();
        let loop_shutdown = shutdown.clone();
        let loop_stopped = stopped.clone();
        let batch_size = config.batch_size;
        let flush_interval = Duration::from_millis(config.flush_interval_ms);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = drain_batches(&loop_queue, &loop_adapter, batch_size).await {
                            tracing::warn!(error = %err, "deferred write batch failed");
                        }
                    }
                    _ = loop_shutdown.notified() => {
                        let _ = drain_batches(&loop_queue, &loop_adapter, usize::MAX).await;
                        break;
                    }
                }
            }
            loop_stopped.store(true, Ordering::SeqCst);
        });

        Self {
            queue,
            adapter,
            shutdown,
            stopped,
            handle: Some(handle),
        }
    }

    /// Enqueue a write-back. Best-effort: logs and drops the write on a
    /// saturated queue rather than propagating an error to the read path.
    pub fn enqueue(&self, write: DeferredWrite) {
        if let Err(err) = self.queue.try_push(write) {
            tracing::warn!(error = %err, "dropping deferred write, queue is saturated");
        }
    }

    /// Force an immediate drain of whatever is currently queued.
    pub async fn flush(&self) -> Result<()> {
        drain_batches(&self.queue, &self.adapter, usize::MAX).await
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Stop the background loop, flushing any pending writes first.
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

async fn drain_batches(queue: &DeferredWriteQueue, adapter: &Arc<dyn StorageAdapter>, max: usize) -> Result<()> {
    let mut by_space: HashMap<SpaceId, Vec<(String, serde_json::Value)>> = HashMap::new();
    let mut drained = 0usize;
    while drained < max {
        let Some(write) = queue.try_pop() else { break };
        by_space.entry(write.space_id).or_default().push((write.key, write.value));
        drained += 1;
    }
    for (space_id, entries) in by_space {
        adapter.multi_put(space_id, entries).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Field, FieldType, Ref};
    use crate::infrastructure::repositories::InMemoryAdapter;
    use serde_json::json;

    fn entity(fields: &[(&str, Value)]) -> Value {
        Value::Map(fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn needs_migration_false_without_migrate_fn() {
        let field = Field::new("name", FieldType::String);
        assert!(!needs_migration(&Value::Number(1.into()), &field));
    }

    #[test]
    fn needs_migration_false_on_null() {
        let field = Field::new("name", FieldType::String).migrate(|v| v);
        assert!(!needs_migration(&Value::Null, &field));
    }

    #[test]
    fn needs_migration_true_on_shape_mismatch() {
        let field = Field::new("translations", FieldType::Map).migrate(|v| v);
        assert!(needs_migration(&Value::List(vec![]), &field));
    }

    #[test]
    fn migrate_entity_rewrites_legacy_list_into_map_of_refs() {
        let fields = vec![Field::new("translations", FieldType::Map).migrate(|v| match v {
            Value::List(ids) => Value::Map(
                ids.into_iter()
                    .filter_map(|id| id.as_str().map(|s| (s.to_string(), Value::Ref(Ref::new(format!("trans:{s}"))))))
                    .collect(),
            ),
            other => other,
        })];

        let value = entity(&[(
            "translations",
            Value::List(vec![Value::String("t1".into()), Value::String("t2".into())]),
        )]);

        let (migrated, changed) = migrate_entity(value, &fields);
        assert!(changed);
        let translations = migrated.as_map().unwrap().get("translations").unwrap();
        let map = translations.as_map().unwrap();
        assert_eq!(map.get("t1").unwrap().as_ref_key().unwrap().as_str(), "trans:t1");
    }

    #[test]
    fn migrate_entity_is_idempotent() {
        let fields = vec![Field::new("count", FieldType::Integer).migrate(|_| Value::Number(0.into()))];
        let value = entity(&[("count", Value::String("bad".into()))]);
        let (once, changed_once) = migrate_entity(value, &fields);
        let (twice, changed_twice) = migrate_entity(once.clone(), &fields);
        assert!(changed_once);
        assert!(!changed_twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn migrate_entity_on_non_map_value_is_a_no_op() {
        let fields = vec![Field::new("x", FieldType::String).migrate(|v| v)];
        let (value, changed) = migrate_entity(Value::Number(1.into()), &fields);
        assert!(!changed);
        assert_eq!(value, Value::Number(1.into()));
    }

    #[tokio::test]
    async fn pipeline_flush_persists_queued_writes() {
        let adapter: Arc<dyn StorageAdapter> = Arc::new(InMemoryAdapter::new());
        let pipeline = DeferredWritePipeline::spawn(
            adapter.clone(),
            DeferredWriteConfig {
                batch_size: 10,
                flush_interval_ms: 50_000,
                queue_capacity: 100,
            },
        );

        pipeline.enqueue(DeferredWrite {
            space_id: SpaceId::new(1),
            key: "entity:e1".to_string(),
            value: json!({"migrated": true}),
        });

        pipeline.flush().await.unwrap();
        assert_eq!(pipeline.pending(), 0);
        assert_eq!(adapter.get(SpaceId::new(1), "entity:e1").await.unwrap(), Some(json!({"migrated": true})));

        pipeline.shutdown().await.unwrap();
    }
}
