//! Crate-wide error type and `Result` alias.

/// Errors surfaced by the event log, space registry, schema engine and
/// projection (PState) and command pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EventSpaceError {
    #[error("space not found: {0}")]
    SpaceNotFound(String),

    #[error("space already exists: {0}")]
    SpaceAlreadyExists(String),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("command rejected: {0}")]
    CommandRejected(String),

    #[error("resolution cycle at '{key}' (path: {path})")]
    ResolutionCycle { key: String, path: String },

    #[error("adapter failure: {0}")]
    AdapterFailure(String),

    #[error("corruption detected: {0}")]
    Corruption(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub use EventSpaceError as Error;

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EventSpaceError>;
