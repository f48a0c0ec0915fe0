//! Long-term promotion and demotion.

use crate::error::{CoreError, NotFoundReason};
use crate::writer::MemoryWriter;
use log::{debug, info, warn};
use scholar_rs_memory::matching::approximately_contains;
use scholar_rs_memory::{
    Exchange, MatchPolicy, Memory, MemoryFilter, MemoryId, MemoryKind, MemoryStore,
};
use std::sync::Arc;

/// Course key for long-term memories created outside a course.
pub fn long_term_course_key(user_id: &str) -> String {
    format!("long-term-{user_id}")
}

/// What to promote in [`MemoryPromoter::promote_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteTarget {
    Memory(MemoryId),
    Exchange {
        user_message: String,
        ai_response: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    Promoted(MemoryId),
    /// Both flags were already set; nothing was written.
    AlreadyLongTerm(MemoryId),
    /// No similar memory existed; a new long-term one was written.
    Created(MemoryId),
}

impl PromoteOutcome {
    pub fn memory_id(&self) -> MemoryId {
        match self {
            PromoteOutcome::Promoted(id)
            | PromoteOutcome::AlreadyLongTerm(id)
            | PromoteOutcome::Created(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgetOutcome {
    Forgotten(MemoryId),
    AlreadyShortTerm(MemoryId),
}

#[derive(Clone)]
pub struct MemoryPromoter {
    store: Arc<dyn MemoryStore>,
    writer: MemoryWriter,
    policy: MatchPolicy,
}

impl MemoryPromoter {
    pub fn new(store: Arc<dyn MemoryStore>, writer: MemoryWriter, policy: MatchPolicy) -> Self {
        Self {
            store,
            writer,
            policy,
        }
    }

    /// Mark a memory owned by `user_id` as long-term. Idempotent.
    pub async fn promote(
        &self,
        memory_id: MemoryId,
        user_id: &str,
    ) -> Result<PromoteOutcome, CoreError> {
        let memory = self.owned(memory_id, user_id).await?;
        if memory.is_longterm {
            debug!("memory already long-term (id={memory_id})");
            return Ok(PromoteOutcome::AlreadyLongTerm(memory_id));
        }
        self.store
            .update_long_term(memory_id, true)
            .await
            .map_err(CoreError::WriteFailed)?;
        info!("promoted memory to long-term (id={memory_id}, user={user_id})");
        Ok(PromoteOutcome::Promoted(memory_id))
    }

    /// Clear the long-term flag of a memory owned by `user_id`. Idempotent.
    pub async fn demote(
        &self,
        memory_id: MemoryId,
        user_id: &str,
    ) -> Result<ForgetOutcome, CoreError> {
        let memory = self.owned(memory_id, user_id).await?;
        if !memory.has_long_term_flag() {
            return Ok(ForgetOutcome::AlreadyShortTerm(memory_id));
        }
        self.store
            .update_long_term(memory_id, false)
            .await
            .map_err(CoreError::WriteFailed)?;
        info!("demoted memory to short-term (id={memory_id}, user={user_id})");
        Ok(ForgetOutcome::Forgotten(memory_id))
    }

    /// Promote a known memory, or the user's memory matching an exchange,
    /// creating a new long-term memory when nothing matches.
    pub async fn promote_or_create(
        &self,
        user_id: &str,
        target: PromoteTarget,
    ) -> Result<PromoteOutcome, CoreError> {
        let (user_message, ai_response) = match target {
            PromoteTarget::Memory(memory_id) => return self.promote(memory_id, user_id).await,
            PromoteTarget::Exchange {
                user_message,
                ai_response,
            } => (user_message, ai_response),
        };

        let content = Exchange::render(&user_message, &ai_response);
        if let Some(existing) = self.find_similar(user_id, &content).await? {
            return self.promote(existing, user_id).await;
        }

        let course_key = long_term_course_key(user_id);
        let created = self
            .writer
            .save(&course_key, &user_message, &ai_response, Some(user_id), true)
            .await
            .map_err(|err| CoreError::CreateFailed(Box::new(err)))?;
        info!(
            "created long-term memory (id={}, user={user_id})",
            created.id
        );
        Ok(PromoteOutcome::Created(created.id))
    }

    async fn owned(&self, memory_id: MemoryId, user_id: &str) -> Result<Memory, CoreError> {
        let memory = self
            .store
            .get(memory_id)
            .await
            .map_err(CoreError::StorageUnavailable)?
            .ok_or(CoreError::NotFound(NotFoundReason::MissingMemory(memory_id)))?;
        if memory.owner() != Some(user_id) {
            warn!("refusing long-term change for non-owner (id={memory_id}, user={user_id})");
            return Err(CoreError::OwnerMismatch {
                memory_id,
                user_id: user_id.to_string(),
            });
        }
        Ok(memory)
    }

    /// Vector similarity first; rows saved without an embedding are only
    /// reachable through the containment heuristic, so it runs when the
    /// vector search finds nothing above the threshold.
    async fn find_similar(
        &self,
        user_id: &str,
        content: &str,
    ) -> Result<Option<MemoryId>, CoreError> {
        let filter = MemoryFilter::default()
            .user(user_id)
            .kind(MemoryKind::Chat);

        if let Some(vector) = self.store.vector_search() {
            match vector.similarity_search(content, &filter, 1).await {
                Ok(hits) => {
                    if let Some(hit) = hits
                        .into_iter()
                        .find(|hit| hit.score >= self.policy.similarity_threshold)
                    {
                        debug!(
                            "found similar memory by vector (id={}, score={:.3})",
                            hit.memory.id, hit.score
                        );
                        return Ok(Some(hit.memory.id));
                    }
                }
                Err(err) => warn!("similarity search failed, using text overlap: {err}"),
            }
        }

        let candidates = self
            .store
            .list(&filter, None)
            .await
            .map_err(CoreError::StorageUnavailable)?;
        Ok(candidates
            .iter()
            .find(|memory| {
                approximately_contains(&memory.content, content, self.policy.overlap_ratio)
            })
            .map(|memory| memory.id))
    }
}
