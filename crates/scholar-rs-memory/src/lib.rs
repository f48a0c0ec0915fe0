//! Course memory storage for Scholar.
//!
//! Holds the memory record model, the storage capability traits, the SQLite
//! adapter (plain relational, optionally vector capable) and the pure
//! matching heuristics used to locate an exchange by content.

pub mod error;
pub mod matching;
pub mod model;
pub mod policy;
pub mod similarity;
pub mod store;

/// Memory error type.
pub use error::MemoryError;
/// Record model.
pub use model::{
    CourseDeletion, CourseMessage, Exchange, Memory, MemoryFilter, MemoryId, MemoryKind,
    MemoryMetadata, MessageRole, NewMemory, ScoredMemory,
};
/// Runtime policies for matching, recall and summaries.
pub use policy::{MatchPolicy, RecallPolicy, SummaryPolicy};
/// Storage capability traits and the SQLite adapter.
pub use store::{Embedder, MemoryStore, SqliteMemoryStore, VectorSearch};
