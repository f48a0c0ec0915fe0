//! Course summary generation.

use crate::error::{CoreError, NotFoundReason};
use autoagents_llm::LLMProvider;
use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
use log::{debug, info, warn};
use moka::ops::compute::Op;
use moka::sync::Cache;
use scholar_rs_memory::{CourseMessage, MemoryId, MemoryStore, NewMemory, SummaryPolicy};
use std::sync::Arc;

/// Headings every summary must carry, in order.
pub const SUMMARY_SECTIONS: [&str; 5] = [
    "Topics Covered",
    "Current Level",
    "Progress",
    "Challenges",
    "Current Focus",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    Created(MemoryId),
    Updated(MemoryId),
}

impl SummaryOutcome {
    pub fn memory_id(&self) -> MemoryId {
        match self {
            SummaryOutcome::Created(id) | SummaryOutcome::Updated(id) => *id,
        }
    }
}

#[derive(Clone)]
pub struct CourseSummarizer {
    store: Arc<dyn MemoryStore>,
    llm: Arc<dyn LLMProvider>,
    policy: SummaryPolicy,
}

impl CourseSummarizer {
    pub fn new(store: Arc<dyn MemoryStore>, llm: Arc<dyn LLMProvider>, policy: SummaryPolicy) -> Self {
        Self { store, llm, policy }
    }

    /// Refresh the summary of `course_id` for `user_id` from recent messages.
    pub async fn summarize(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<SummaryOutcome, CoreError> {
        let mut messages = self
            .store
            .recent_messages(course_id, self.policy.message_window)
            .await
            .map_err(CoreError::StorageUnavailable)?;
        if messages.is_empty() {
            return Err(CoreError::NotFound(NotFoundReason::NoMessages));
        }
        messages.reverse();

        let previous = self
            .store
            .find_summary(course_id, user_id)
            .await
            .map_err(CoreError::StorageUnavailable)?;

        let prompt = build_summary_prompt(
            &messages,
            previous.as_ref().map(|summary| summary.content.as_str()),
        );
        let request = [ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: prompt,
        }];
        let response = self
            .llm
            .chat_with_tools(&request, None, None)
            .await
            .map_err(|err| CoreError::LlmFailed(err.to_string()))?;
        let text = response
            .text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| CoreError::LlmFailed("empty summary response".to_string()))?;
        debug!(
            "generated course summary (course={course_id}, messages={}, chars={})",
            messages.len(),
            text.len()
        );

        let embedding = self.embed_summary(&text).await;

        let outcome = match previous {
            Some(summary) => {
                self.store
                    .update_content(summary.id, &text, embedding.as_deref())
                    .await
                    .map_err(CoreError::WriteFailed)?;
                SummaryOutcome::Updated(summary.id)
            }
            None => {
                let mut summary = NewMemory::summary(course_id, user_id, text);
                summary.embedding = embedding;
                let created = self
                    .store
                    .insert(summary)
                    .await
                    .map_err(CoreError::WriteFailed)?;
                SummaryOutcome::Created(created.id)
            }
        };
        info!("course summary persisted (course={course_id}, user={user_id}, outcome={outcome:?})");
        Ok(outcome)
    }

    /// `None` without vector capability; a zero vector when embedding fails.
    async fn embed_summary(&self, text: &str) -> Option<Vec<f32>> {
        let vector = self.store.vector_search()?;
        match vector.embed(text).await {
            Ok(embedding) => Some(embedding),
            Err(err) => {
                warn!("summary embedding failed, storing zero vector: {err}");
                Some(vec![0.0; vector.dimensions()])
            }
        }
    }
}

/// Summary prompt over chronological messages and the previous summary.
pub fn build_summary_prompt(messages: &[CourseMessage], previous: Option<&str>) -> String {
    let mut prompt = String::from(
        "You maintain a running summary of a student's tutoring course.\n\
         Merge the new conversation into the previous summary: rewrite it as one \
         coherent summary instead of appending a new one.\n\
         Use exactly these sections, each as a heading followed by short prose:\n",
    );
    for section in SUMMARY_SECTIONS {
        prompt.push_str("- ");
        prompt.push_str(section);
        prompt.push('\n');
    }

    prompt.push_str("\nPrevious summary:\n");
    prompt.push_str(previous.map(str::trim).unwrap_or("(none)"));
    prompt.push_str("\n\nConversation:\n");
    for message in messages {
        let speaker = if message.role.is_user() {
            "Student"
        } else {
            "Tutor"
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(message.content.trim());
        prompt.push('\n');
    }
    prompt
}

/// Courses whose turn counts are kept; the least recently active are dropped.
const TRACKED_COURSES: u64 = 10_000;

/// Per-course turn counter deciding when a summary is due.
///
/// A course's count restarts once its summary is due.
pub struct SummaryCadence {
    policy: SummaryPolicy,
    turns: Cache<String, usize>,
}

impl Default for SummaryCadence {
    fn default() -> Self {
        Self::new(SummaryPolicy::default())
    }
}

impl std::fmt::Debug for SummaryCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryCadence")
            .field("policy", &self.policy)
            .field("courses", &self.turns.entry_count())
            .finish()
    }
}

impl SummaryCadence {
    pub fn new(policy: SummaryPolicy) -> Self {
        Self::with_capacity(policy, TRACKED_COURSES)
    }

    pub fn with_capacity(policy: SummaryPolicy, courses: u64) -> Self {
        Self {
            policy,
            turns: Cache::new(courses.max(1)),
        }
    }

    pub fn should_summarize(&self, turn_count: usize) -> bool {
        self.policy.is_due(turn_count)
    }

    /// Count a completed turn for `course_id`; true when the summary is due.
    pub fn record_turn(&self, course_id: &str) -> bool {
        let mut due = false;
        self.turns
            .entry(course_id.to_string())
            .and_compute_with(|entry| {
                let count = entry.map_or(0, |entry| entry.into_value()) + 1;
                due = self.should_summarize(count);
                if due { Op::Remove } else { Op::Put(count) }
            });
        due
    }

    pub fn forget_course(&self, course_id: &str) {
        self.turns.invalidate(course_id);
    }

    /// Courses with turns counted since their last summary.
    pub fn tracked_courses(&self) -> usize {
        self.turns.run_pending_tasks();
        self.turns.entry_count() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{SUMMARY_SECTIONS, SummaryCadence, build_summary_prompt};
    use pretty_assertions::assert_eq;
    use scholar_rs_memory::{CourseMessage, MessageRole, SummaryPolicy};

    #[test]
    fn prompt_lists_sections_and_conversation_in_order() {
        let messages = vec![
            CourseMessage::new("c1", MessageRole::User, "What is a tuple?"),
            CourseMessage::new("c1", MessageRole::Model, "An immutable sequence."),
        ];
        let prompt = build_summary_prompt(&messages, Some("Knows lists."));
        for section in SUMMARY_SECTIONS {
            assert!(prompt.contains(section), "{section}");
        }
        assert!(prompt.contains("Previous summary:\nKnows lists."));
        let student = prompt.find("Student: What is a tuple?").expect("student");
        let tutor = prompt.find("Tutor: An immutable sequence.").expect("tutor");
        assert!(student < tutor);
    }

    #[test]
    fn prompt_marks_missing_previous_summary() {
        let messages = vec![CourseMessage::new("c1", MessageRole::User, "hi")];
        assert!(build_summary_prompt(&messages, None).contains("Previous summary:\n(none)"));
    }

    #[test]
    fn cadence_counts_turns_per_course() {
        let cadence = SummaryCadence::new(SummaryPolicy {
            every_n_turns: 2,
            ..SummaryPolicy::default()
        });
        assert!(!cadence.record_turn("c1"));
        assert!(!cadence.record_turn("c2"));
        assert!(cadence.record_turn("c1"));
        cadence.forget_course("c2");
        assert!(!cadence.record_turn("c2"));
        assert!(cadence.record_turn("c2"));
    }

    #[test]
    fn cadence_drops_counts_once_summary_is_due() {
        let cadence = SummaryCadence::new(SummaryPolicy {
            every_n_turns: 2,
            ..SummaryPolicy::default()
        });
        for course in ["c1", "c2", "c3"] {
            assert!(!cadence.record_turn(course));
        }
        assert_eq!(cadence.tracked_courses(), 3);
        assert!(cadence.record_turn("c1"));
        assert!(cadence.record_turn("c2"));
        assert_eq!(cadence.tracked_courses(), 1);
        assert!(!cadence.record_turn("c1"));
        assert!(cadence.record_turn("c1"));
    }

    #[test]
    fn cadence_is_bounded() {
        let cadence = SummaryCadence::with_capacity(SummaryPolicy::default(), 2);
        for course in ["c1", "c2", "c3", "c4"] {
            cadence.record_turn(course);
        }
        assert!(cadence.tracked_courses() <= 2);
    }
}
