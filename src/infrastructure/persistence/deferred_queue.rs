use crossbeam::queue::ArrayQueue;
use serde_json::Value as Json;
use std::sync::Arc;

use crate::domain::value_objects::SpaceId;
use crate::error::{EventSpaceError, Result};

/// One migrated field waiting to be written back to storage.
#[derive(Debug, Clone)]
pub struct DeferredWrite {
    pub space_id: SpaceId,
    pub key: String,
    pub value: Json,
}

/// Lock-free bounded queue feeding the deferred-write actor (see
/// [`crate::application::migration::DeferredWritePipeline`]). Migration
/// itself runs on the hot read path, so enqueueing must never block or
/// contend with a lock; `try_push` simply drops the write-back on a full
/// queue, since correctness never depends on it (the next read re-migrates
/// and re-enqueues).
#[derive(Clone)]
pub struct DeferredWriteQueue {
    queue: Arc<ArrayQueue<DeferredWrite>>,
    capacity: usize,
}

impl DeferredWriteQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
            capacity,
        }
    }

    /// Enqueue a write-back. Returns an `AdapterFailure`-shaped error when
    /// the queue is saturated; callers on the read path should treat this
    /// as best-effort and not propagate it to their own caller.
    pub fn try_push(&self, write: DeferredWrite) -> Result<()> {
        self.queue
            .push(write)
            .map_err(|_| EventSpaceError::AdapterFailure(format!("deferred write queue at capacity ({})", self.capacity)))
    }

    pub fn try_pop(&self) -> Option<DeferredWrite> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
