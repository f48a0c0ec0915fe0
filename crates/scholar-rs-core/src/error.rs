//! Error types for the memory lifecycle operations.

use scholar_rs_memory::{MemoryError, MemoryId};
use thiserror::Error;

/// Why a lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotFoundReason {
    /// The course has no memories for this user.
    #[error("no memories for course")]
    NoMemories,
    /// Memories exist but none contains the query prefix.
    #[error("no memory matches the message")]
    NoMatch,
    /// The referenced memory id does not exist.
    #[error("memory {0} does not exist")]
    MissingMemory(MemoryId),
    /// The course has no messages to summarize.
    #[error("no messages for course")]
    NoMessages,
}

/// Errors returned by the lifecycle components.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(NotFoundReason),
    /// The caller does not own the memory.
    #[error("memory {memory_id} is not owned by {user_id}")]
    OwnerMismatch { memory_id: MemoryId, user_id: String },
    /// A read against the store failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] MemoryError),
    /// The store rejected an insert or update.
    #[error("write failed: {0}")]
    WriteFailed(#[source] MemoryError),
    /// Summary generation errored or returned nothing.
    #[error("llm failed: {0}")]
    LlmFailed(String),
    /// Creating a new long-term memory failed.
    #[error("create failed: {0}")]
    CreateFailed(#[source] Box<CoreError>),
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}
