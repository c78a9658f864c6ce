pub mod deferred_queue;

pub use deferred_queue::{DeferredWrite, DeferredWriteQueue};
