//! Test helpers shared across Scholar crates.

pub mod embedder;
pub mod fixtures;
pub mod llm;
pub mod store;

pub use embedder::{FailingEmbedder, HashEmbedder};
pub use fixtures::{relational_store, seed_exchange, vector_store};
pub use llm::{FailingLLM, FixedChatResponse, FixedLLM, RecordingChatLLM};
pub use store::FaultyStore;
