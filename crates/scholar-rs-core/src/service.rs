//! Public memory service boundary.
//!
//! Every operation reports success as a plain value and logs the failure
//! instead of returning it.

use crate::embedding::LlmEmbedder;
use crate::error::{CoreError, NotFoundReason};
use crate::history::SessionHistory;
use crate::matcher::MemoryMatcher;
use crate::promoter::{MemoryPromoter, PromoteTarget};
use crate::recall::{MemoryRecaller, format_context};
use crate::settings::{
    history_from_config, match_policy_from_config, recall_policy_from_config,
    summary_policy_from_config,
};
use crate::summarizer::{CourseSummarizer, SummaryCadence};
use crate::writer::MemoryWriter;
use autoagents_llm::LLMProvider;
use log::{debug, error, info, warn};
use scholar_rs_config::ScholarConfig;
use scholar_rs_memory::{
    CourseDeletion, CourseMessage, Memory, MemoryError, MemoryId, MemoryStore, MessageRole,
    SqliteMemoryStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Database file used when neither the config nor the caller names one.
pub const DEFAULT_DB_PATH: &str = ".scholar/memory.db";

/// Result of [`MemoryService::find_memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindOutcome {
    Found { memory_id: MemoryId },
    NotFound { reason: NotFoundReason },
    /// The store could not be read.
    Unavailable,
}

impl FindOutcome {
    pub fn memory_id(&self) -> Option<MemoryId> {
        match self {
            FindOutcome::Found { memory_id } => Some(*memory_id),
            _ => None,
        }
    }
}

/// Open the SQLite store named by config, enabling vector search when
/// embeddings are on and a provider is available.
pub fn open_sqlite_store(
    config: &ScholarConfig,
    path_override: Option<&Path>,
    llm: Option<Arc<dyn LLMProvider>>,
) -> Result<SqliteMemoryStore, MemoryError> {
    let path = path_override.map(Path::to_path_buf).unwrap_or_else(|| {
        PathBuf::from(config.memory.path.as_deref().unwrap_or(DEFAULT_DB_PATH))
    });
    let store = SqliteMemoryStore::open(&path)?;
    match llm {
        Some(llm) if config.memory.embeddings.enabled => Ok(store.with_embedder(Arc::new(
            LlmEmbedder::new(llm, config.memory.embeddings.dimensions),
        ))),
        _ => {
            info!("vector search disabled, using relational memory store");
            Ok(store)
        }
    }
}

pub struct MemoryServiceBuilder {
    store: Arc<dyn MemoryStore>,
    config: ScholarConfig,
    llm: Option<Arc<dyn LLMProvider>>,
}

impl MemoryServiceBuilder {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            config: ScholarConfig::default(),
            llm: None,
        }
    }

    pub fn config(mut self, config: &ScholarConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Provider used for course summaries.
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn build(self) -> MemoryService {
        let memory = &self.config.memory;
        let match_policy = match_policy_from_config(&memory.matching);
        let summary_policy = summary_policy_from_config(&memory.summary);
        let writer = MemoryWriter::new(self.store.clone());
        MemoryService {
            matcher: MemoryMatcher::new(self.store.clone(), match_policy.clone()),
            promoter: MemoryPromoter::new(self.store.clone(), writer.clone(), match_policy),
            recaller: MemoryRecaller::new(
                self.store.clone(),
                recall_policy_from_config(&memory.recall),
            ),
            summarizer: self.llm.map(|llm| {
                CourseSummarizer::new(self.store.clone(), llm, summary_policy.clone())
            }),
            cadence: SummaryCadence::new(summary_policy),
            history: history_from_config(&self.config.history),
            writer,
            store: self.store,
        }
    }
}

/// Memory lifecycle operations for request handlers.
pub struct MemoryService {
    store: Arc<dyn MemoryStore>,
    writer: MemoryWriter,
    matcher: MemoryMatcher,
    promoter: MemoryPromoter,
    recaller: MemoryRecaller,
    summarizer: Option<CourseSummarizer>,
    cadence: SummaryCadence,
    history: SessionHistory,
}

impl MemoryService {
    pub fn builder(store: Arc<dyn MemoryStore>) -> MemoryServiceBuilder {
        MemoryServiceBuilder::new(store)
    }

    /// Service with default policies and no summary provider.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        MemoryServiceBuilder::new(store).build()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub async fn save_memory(
        &self,
        course_id: &str,
        user_message: &str,
        ai_response: &str,
        user_id: Option<&str>,
        is_long_term: bool,
    ) -> bool {
        self.writer
            .save(course_id, user_message, ai_response, user_id, is_long_term)
            .await
            .is_ok()
    }

    pub async fn find_memory(
        &self,
        course_id: &str,
        user_message: &str,
        user_id: &str,
    ) -> FindOutcome {
        match self.matcher.find(course_id, user_message, user_id).await {
            Ok(memory_id) => FindOutcome::Found { memory_id },
            Err(CoreError::NotFound(reason)) => {
                debug!("no memory found (course={course_id}, user={user_id}): {reason}");
                FindOutcome::NotFound { reason }
            }
            Err(err) => {
                error!("find memory failed (course={course_id}, user={user_id}): {err}");
                FindOutcome::Unavailable
            }
        }
    }

    pub async fn promote(&self, memory_id: MemoryId, user_id: &str) -> bool {
        match self.promoter.promote(memory_id, user_id).await {
            Ok(_) => true,
            Err(err) => {
                warn!("promote failed (id={memory_id}, user={user_id}): {err}");
                false
            }
        }
    }

    pub async fn promote_or_create(&self, user_id: &str, target: PromoteTarget) -> bool {
        match self.promoter.promote_or_create(user_id, target).await {
            Ok(outcome) => {
                debug!("promote or create succeeded (user={user_id}, outcome={outcome:?})");
                true
            }
            Err(err) => {
                warn!("promote or create failed (user={user_id}): {err}");
                false
            }
        }
    }

    /// Drop a memory back to short-term.
    pub async fn forget(&self, memory_id: MemoryId, user_id: &str) -> bool {
        match self.promoter.demote(memory_id, user_id).await {
            Ok(_) => true,
            Err(err) => {
                warn!("forget failed (id={memory_id}, user={user_id}): {err}");
                false
            }
        }
    }

    /// Recalled memories, summary first; empty on failure.
    pub async fn recall(
        &self,
        course_id: &str,
        query: &str,
        user_id: Option<&str>,
    ) -> Vec<Memory> {
        match self.recaller.recall(course_id, query, user_id).await {
            Ok(recall) => recall.collect(),
            Err(err) => {
                error!("recall failed (course={course_id}): {err}");
                Vec::new()
            }
        }
    }

    /// Recall rendered as prompt context.
    pub async fn recall_context(
        &self,
        course_id: &str,
        query: &str,
        user_id: Option<&str>,
    ) -> String {
        format_context(&self.recall(course_id, query, user_id).await)
    }

    pub async fn summarize(&self, course_id: &str, user_id: &str) -> bool {
        let Some(summarizer) = self.summarizer.as_ref() else {
            warn!("summarize requested without an llm provider (course={course_id})");
            return false;
        };
        match summarizer.summarize(course_id, user_id).await {
            Ok(_) => true,
            Err(err) => {
                warn!("summarize failed (course={course_id}, user={user_id}): {err}");
                false
            }
        }
    }

    /// Store a raw course message for later summaries.
    pub async fn record_message(&self, course_id: &str, role: MessageRole, content: &str) -> bool {
        match self
            .store
            .append_message(CourseMessage::new(course_id, role, content))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!("record message failed (course={course_id}): {err}");
                false
            }
        }
    }

    /// Count a finished chat turn and refresh the summary when it is due.
    ///
    /// Returns true only when a summary was written.
    pub async fn complete_turn(&self, course_id: &str, user_id: &str) -> bool {
        if !self.cadence.record_turn(course_id) {
            return false;
        }
        self.summarize(course_id, user_id).await
    }

    pub async fn delete_course(&self, course_id: &str) -> Option<CourseDeletion> {
        self.cadence.forget_course(course_id);
        match self.store.delete_course(course_id).await {
            Ok(deletion) => Some(deletion),
            Err(err) => {
                error!("delete course failed (course={course_id}): {err}");
                None
            }
        }
    }
}
