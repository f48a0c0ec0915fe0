//! Memory record model used by stores and the lifecycle operations.

use crate::error::MemoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned by the store at insert time.
pub type MemoryId = Uuid;

/// Separator between the user and assistant halves of a chat record.
pub const EXCHANGE_SEPARATOR: &str = "\nAI: ";
const USER_PREFIX: &str = "USER: ";

/// Distinguishes chat exchanges from course summaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    #[default]
    Chat,
    CourseSummary,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Chat => "chat",
            MemoryKind::CourseSummary => "course_summary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(MemoryKind::Chat),
            "course_summary" => Some(MemoryKind::CourseSummary),
            _ => None,
        }
    }
}

/// JSON metadata stored next to every memory.
///
/// `is_longterm` mirrors the dedicated column; stores write both together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetadata {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub kind: MemoryKind,
    #[serde(default)]
    pub is_longterm: bool,
}

/// Persisted memory record.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub id: MemoryId,
    /// `USER: ..\nAI: ..` for chat records, prose for summaries.
    pub content: String,
    pub course_id: Option<String>,
    pub user_id: Option<String>,
    pub kind: MemoryKind,
    /// True only when the column and the metadata flag agree.
    pub is_longterm: bool,
    /// Raw `is_longterm` column, which may disagree with the metadata.
    pub longterm_column: bool,
    pub metadata: MemoryMetadata,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Memory {
    /// Whether either stored flag still marks the memory as long-term.
    pub fn has_long_term_flag(&self) -> bool {
        self.longterm_column || self.metadata.is_longterm
    }

    /// Owning user, from the column or else from metadata.
    pub fn owner(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or(self.metadata.user_id.as_deref())
    }

    /// Parsed exchange for chat records; `None` for malformed content.
    pub fn exchange(&self) -> Option<Exchange<'_>> {
        if self.kind != MemoryKind::Chat {
            return None;
        }
        Exchange::parse(&self.content)
    }
}

/// Memory about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub content: String,
    pub course_id: Option<String>,
    pub user_id: Option<String>,
    pub kind: MemoryKind,
    pub is_longterm: bool,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl NewMemory {
    /// Chat exchange in canonical form.
    pub fn exchange(
        course_id: impl Into<String>,
        user_message: &str,
        ai_response: &str,
        user_id: Option<&str>,
        is_longterm: bool,
    ) -> Self {
        Self {
            content: Exchange::render(user_message, ai_response),
            course_id: Some(course_id.into()),
            user_id: user_id.map(str::to_string),
            kind: MemoryKind::Chat,
            is_longterm,
            embedding: None,
            created_at: Utc::now(),
        }
    }

    /// Course summary owned by `user_id`.
    pub fn summary(course_id: &str, user_id: &str, text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            course_id: Some(course_id.to_string()),
            user_id: Some(user_id.to_string()),
            kind: MemoryKind::CourseSummary,
            is_longterm: false,
            embedding: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Metadata blob carrying the same fields as the columns.
    pub fn metadata(&self) -> MemoryMetadata {
        MemoryMetadata {
            user_id: self.user_id.clone(),
            course_id: self.course_id.clone(),
            timestamp: self.created_at,
            kind: self.kind,
            is_longterm: self.is_longterm,
        }
    }
}

/// Borrowed view over a chat record's two halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange<'a> {
    pub user: &'a str,
    pub ai: &'a str,
}

impl<'a> Exchange<'a> {
    /// Split content on the separator. Anything other than exactly two parts
    /// is rejected.
    pub fn parse(content: &'a str) -> Option<Self> {
        let mut parts = content.split(EXCHANGE_SEPARATOR);
        let user = parts.next()?;
        let ai = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        let user = user.strip_prefix(USER_PREFIX).unwrap_or(user);
        Some(Self { user, ai })
    }

    /// Both halves must be free of the separator.
    pub fn check(user_message: &str, ai_response: &str) -> Result<(), MemoryError> {
        for (half, text) in [("user message", user_message), ("ai response", ai_response)] {
            if text.contains(EXCHANGE_SEPARATOR) {
                return Err(MemoryError::InvalidRecord(format!(
                    "{half} contains the exchange separator"
                )));
            }
        }
        Ok(())
    }

    pub fn render(user_message: &str, ai_response: &str) -> String {
        format!("{USER_PREFIX}{user_message}{EXCHANGE_SEPARATOR}{ai_response}")
    }
}

/// Speaker of a raw course message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Gemini's name for the assistant turn.
    Model,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Model => "model",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            "model" => Some(MessageRole::Model),
            _ => None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, MessageRole::User)
    }
}

/// Raw chat message kept per course; input to course summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseMessage {
    pub id: Uuid,
    pub course_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CourseMessage {
    pub fn new(course_id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id: course_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Row filter shared by listing and similarity search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryFilter {
    pub user_id: Option<String>,
    pub course_id: Option<String>,
    pub kind: Option<MemoryKind>,
    pub long_term_only: bool,
}

impl MemoryFilter {
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn long_term(mut self) -> Self {
        self.long_term_only = true;
        self
    }
}

/// Similarity search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub score: f32,
}

/// Result of deleting a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseDeletion {
    /// Short-term memories removed.
    pub deleted: usize,
    /// Long-term memories kept with their course reference cleared.
    pub detached: usize,
    pub deleted_messages: usize,
}

#[cfg(test)]
mod tests {
    use super::{Exchange, MemoryKind, MemoryMetadata, NewMemory};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn exchange_renders_and_parses() {
        let content = Exchange::render("What is a tuple?", "An immutable sequence.");
        assert_eq!(content, "USER: What is a tuple?\nAI: An immutable sequence.");
        assert_eq!(
            Exchange::parse(&content),
            Some(Exchange {
                user: "What is a tuple?",
                ai: "An immutable sequence."
            })
        );
    }

    #[test]
    fn check_rejects_embedded_separator() {
        assert!(Exchange::check("What is a tuple?", "An immutable sequence.").is_ok());
        assert!(Exchange::check("Is this right?\nAI: maybe", "Yes.").is_err());
        assert!(Exchange::check("Quote this", "USER: hi\nAI: hello").is_err());
        assert!(Exchange::check("line one\nAI:no space", "ok").is_ok());
    }

    #[test]
    fn exchange_rejects_missing_or_repeated_separator() {
        assert_eq!(Exchange::parse("USER: hello"), None);
        assert_eq!(Exchange::parse("USER: a\nAI: b\nAI: c"), None);
    }

    #[test]
    fn metadata_uses_camel_case_keys() {
        let memory = NewMemory::exchange("c1", "q", "a", Some("u1"), true);
        let value = serde_json::to_value(memory.metadata()).expect("metadata");
        assert_eq!(value["userId"], json!("u1"));
        assert_eq!(value["courseId"], json!("c1"));
        assert_eq!(value["type"], json!("chat"));
        assert_eq!(value["isLongterm"], json!(true));
    }

    #[test]
    fn metadata_defaults_missing_flags() {
        let metadata: MemoryMetadata =
            serde_json::from_value(json!({ "timestamp": "2024-05-01T10:00:00Z" }))
                .expect("metadata");
        assert_eq!(metadata.kind, MemoryKind::Chat);
        assert!(!metadata.is_longterm);
        assert_eq!(metadata.user_id, None);
    }
}
