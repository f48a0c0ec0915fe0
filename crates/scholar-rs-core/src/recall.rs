//! Assembling memories for prompt context.

use crate::error::CoreError;
use log::{debug, warn};
use scholar_rs_memory::{Memory, MemoryFilter, MemoryKind, MemoryStore, RecallPolicy};
use std::sync::Arc;

/// Recalled memories, summary first.
///
/// Finite and consumed once.
#[derive(Debug)]
pub struct Recall {
    memories: std::vec::IntoIter<Memory>,
}

impl Recall {
    fn new(memories: Vec<Memory>) -> Self {
        Self {
            memories: memories.into_iter(),
        }
    }
}

impl Iterator for Recall {
    type Item = Memory;

    fn next(&mut self) -> Option<Self::Item> {
        self.memories.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.memories.size_hint()
    }
}

impl ExactSizeIterator for Recall {}

#[derive(Clone)]
pub struct MemoryRecaller {
    store: Arc<dyn MemoryStore>,
    policy: RecallPolicy,
}

impl MemoryRecaller {
    pub fn new(store: Arc<dyn MemoryStore>, policy: RecallPolicy) -> Self {
        Self { store, policy }
    }

    /// Anonymous callers get the newest chat memories of the course.
    /// Authenticated callers get their course summary followed by their
    /// long-term memories from any course.
    pub async fn recall(
        &self,
        course_id: &str,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Recall, CoreError> {
        let Some(user_id) = user_id else {
            let filter = MemoryFilter::default()
                .course(course_id)
                .kind(MemoryKind::Chat);
            let recent = self
                .store
                .list(&filter, Some(self.policy.limit))
                .await
                .map_err(CoreError::StorageUnavailable)?;
            debug!("recalled {} anonymous memories (course={course_id})", recent.len());
            return Ok(Recall::new(recent));
        };

        let summary = self
            .store
            .find_summary(course_id, user_id)
            .await
            .map_err(CoreError::StorageUnavailable)?;
        let mut long_term = self.similar_long_term(query, user_id).await;
        if long_term.is_empty() {
            long_term = self
                .store
                .list_long_term(user_id, self.policy.limit)
                .await
                .map_err(CoreError::StorageUnavailable)?;
        }
        long_term.truncate(self.policy.limit);

        let mut memories = Vec::with_capacity(self.policy.max_results());
        memories.extend(summary);
        memories.extend(long_term);
        debug!(
            "recalled {} memories (course={course_id}, user={user_id})",
            memories.len()
        );
        Ok(Recall::new(memories))
    }

    async fn similar_long_term(&self, query: &str, user_id: &str) -> Vec<Memory> {
        let Some(vector) = self.store.vector_search() else {
            return Vec::new();
        };
        let filter = MemoryFilter::default()
            .user(user_id)
            .kind(MemoryKind::Chat)
            .long_term();
        let query = self.policy.effective_query(query);
        match vector
            .similarity_search(query, &filter, self.policy.limit)
            .await
        {
            Ok(hits) => hits.into_iter().map(|hit| hit.memory).collect(),
            Err(err) => {
                warn!("long-term similarity search failed (user={user_id}): {err}");
                Vec::new()
            }
        }
    }
}

/// Render recalled memories for prompt injection.
///
/// Chat records whose content does not parse are left out.
pub fn format_context(memories: &[Memory]) -> String {
    let mut sections = Vec::new();
    for memory in memories {
        match memory.kind {
            MemoryKind::CourseSummary => {
                sections.push(format!("Course summary:\n{}", memory.content.trim()));
            }
            MemoryKind::Chat => {
                let Some(exchange) = memory.exchange() else {
                    continue;
                };
                let label = if memory.is_longterm {
                    "Remembered exchange"
                } else {
                    "Recent exchange"
                };
                sections.push(format!(
                    "{label}:\nStudent: {}\nTutor: {}",
                    exchange.user.trim(),
                    exchange.ai.trim()
                ));
            }
        }
    }
    sections.join("\n\n")
}
