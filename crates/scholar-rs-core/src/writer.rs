//! Persisting chat exchanges.

use crate::error::CoreError;
use log::{debug, error, warn};
use scholar_rs_memory::{Exchange, Memory, MemoryStore, NewMemory};
use std::sync::Arc;

/// Saves exchanges through the vector path when available, relational otherwise.
#[derive(Clone)]
pub struct MemoryWriter {
    store: Arc<dyn MemoryStore>,
}

impl MemoryWriter {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Persist one exchange.
    ///
    /// A failing vector path falls back to a plain insert with the same
    /// fields; only a failure of both is an error. Halves containing the
    /// exchange separator are rejected before either path runs.
    pub async fn save(
        &self,
        course_id: &str,
        user_message: &str,
        ai_response: &str,
        user_id: Option<&str>,
        is_long_term: bool,
    ) -> Result<Memory, CoreError> {
        if let Err(err) = Exchange::check(user_message, ai_response) {
            warn!("refusing to save malformed exchange (course={course_id}): {err}");
            return Err(CoreError::WriteFailed(err));
        }
        let memory =
            NewMemory::exchange(course_id, user_message, ai_response, user_id, is_long_term);

        if let Some(vector) = self.store.vector_search() {
            match vector.add_document(memory.clone()).await {
                Ok(saved) => {
                    debug!("saved memory through vector path (id={})", saved.id);
                    return Ok(saved);
                }
                Err(err) => {
                    warn!("vector save failed, falling back to relational insert (course={course_id}): {err}");
                }
            }
        }

        match self.store.insert(memory).await {
            Ok(saved) => {
                debug!("saved memory through relational path (id={})", saved.id);
                Ok(saved)
            }
            Err(err) => {
                error!("failed to save memory (course={course_id}): {err}");
                Err(CoreError::WriteFailed(err))
            }
        }
    }
}
