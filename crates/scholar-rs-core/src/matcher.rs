//! Resolving a chat message to the stored exchange.

use crate::error::{CoreError, NotFoundReason};
use log::debug;
use scholar_rs_memory::matching::best_match;
use scholar_rs_memory::{MatchPolicy, MemoryId, MemoryKind, MemoryStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct MemoryMatcher {
    store: Arc<dyn MemoryStore>,
    policy: MatchPolicy,
}

impl MemoryMatcher {
    pub fn new(store: Arc<dyn MemoryStore>, policy: MatchPolicy) -> Self {
        Self { store, policy }
    }

    /// Id of the user's chat memory in `course_id` that best represents
    /// `user_message`.
    pub async fn find(
        &self,
        course_id: &str,
        user_message: &str,
        user_id: &str,
    ) -> Result<MemoryId, CoreError> {
        let candidates: Vec<_> = self
            .store
            .list_for_course(course_id, Some(user_id), None)
            .await
            .map_err(CoreError::StorageUnavailable)?
            .into_iter()
            .filter(|memory| memory.kind == MemoryKind::Chat)
            .collect();
        if candidates.is_empty() {
            return Err(CoreError::NotFound(NotFoundReason::NoMemories));
        }
        let found = best_match(&candidates, user_message, self.policy.prefix_chars)
            .ok_or(CoreError::NotFound(NotFoundReason::NoMatch))?;
        debug!(
            "matched memory (id={}, candidates={})",
            found.id,
            candidates.len()
        );
        Ok(found.id)
    }
}
