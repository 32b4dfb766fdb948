//! Error types for the mirror store.

use thiserror::Error;

/// Result alias used across the store surface.
pub type StateResult<T> = Result<T, StateError>;

/// Failure modes of the embedded mirror store.
///
/// Variants follow the redb call structure (open, transaction, table,
/// read, write) plus the JSON encoding of stored values.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open mirror database: {0}")]
    Open(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("table open failed: {0}")]
    Table(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("value serialization failed: {0}")]
    Serialize(String),

    #[error("value deserialization failed: {0}")]
    Deserialize(String),
}
