//! Error types for memory storage.

use uuid::Uuid;

/// Errors returned by memory stores and helpers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Metadata (de)serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Embedding backend failed or returned an unusable vector.
    #[error("embedding error: {0}")]
    Embedding(String),
    /// No memory with this id.
    #[error("memory not found: {0}")]
    NotFound(Uuid),
    /// A stored row could not be decoded.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// The store lacks the capability the call needs.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}
