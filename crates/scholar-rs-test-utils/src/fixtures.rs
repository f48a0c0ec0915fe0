use crate::embedder::HashEmbedder;
use scholar_rs_memory::{Memory, MemoryStore, NewMemory, SqliteMemoryStore};
use std::sync::Arc;

/// In-memory store without vector capability.
pub fn relational_store() -> SqliteMemoryStore {
    match SqliteMemoryStore::open_in_memory() {
        Ok(store) => store,
        Err(err) => panic!("in-memory sqlite store: {err}"),
    }
}

/// In-memory store with a [`HashEmbedder`].
pub fn vector_store() -> SqliteMemoryStore {
    relational_store().with_embedder(Arc::new(HashEmbedder::default()))
}

/// Insert a chat exchange directly through the relational path.
pub async fn seed_exchange(
    store: &dyn MemoryStore,
    course_id: &str,
    user_id: Option<&str>,
    user_message: &str,
    ai_response: &str,
    long_term: bool,
) -> Memory {
    let memory = NewMemory::exchange(course_id, user_message, ai_response, user_id, long_term);
    match store.insert(memory).await {
        Ok(memory) => memory,
        Err(err) => panic!("seed exchange: {err}"),
    }
}
