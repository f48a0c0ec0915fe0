//! Storage capability interface.
//!
//! Every store is relational; vector similarity is an optional capability a
//! store advertises through [`MemoryStore::vector_search`].

mod sqlite;

use crate::error::MemoryError;
use crate::model::{
    CourseDeletion, CourseMessage, Memory, MemoryFilter, MemoryId, NewMemory, ScoredMemory,
};
use async_trait::async_trait;

pub use sqlite::SqliteMemoryStore;

#[async_trait]
/// Relational memory storage used by the lifecycle operations.
pub trait MemoryStore: Send + Sync {
    /// Insert a record; the store assigns the id.
    async fn insert(&self, memory: NewMemory) -> Result<Memory, MemoryError>;

    async fn get(&self, id: MemoryId) -> Result<Option<Memory>, MemoryError>;

    /// Records matching `filter`, newest first.
    async fn list(
        &self,
        filter: &MemoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Memory>, MemoryError>;

    /// Records of a course, optionally narrowed to one user, newest first.
    async fn list_for_course(
        &self,
        course_id: &str,
        user_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Memory>, MemoryError> {
        let mut filter = MemoryFilter::default().course(course_id);
        filter.user_id = user_id.map(str::to_string);
        self.list(&filter, limit).await
    }

    /// Long-term records of a user across all courses, newest first.
    async fn list_long_term(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        let filter = MemoryFilter::default().user(user_id).long_term();
        self.list(&filter, Some(limit)).await
    }

    /// The course summary owned by `user_id`, if one exists.
    async fn find_summary(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Option<Memory>, MemoryError>;

    /// Write the long-term flag to the column and the metadata together.
    async fn update_long_term(&self, id: MemoryId, long_term: bool) -> Result<(), MemoryError>;

    /// Replace content in place; `None` keeps the stored embedding.
    async fn update_content(
        &self,
        id: MemoryId,
        content: &str,
        embedding: Option<&[f32]>,
    ) -> Result<(), MemoryError>;

    /// Delete short-term records and messages of a course, detach long-term ones.
    async fn delete_course(&self, course_id: &str) -> Result<CourseDeletion, MemoryError>;

    async fn append_message(&self, message: CourseMessage) -> Result<(), MemoryError>;

    /// Most recent messages of a course, newest first.
    async fn recent_messages(
        &self,
        course_id: &str,
        limit: usize,
    ) -> Result<Vec<CourseMessage>, MemoryError>;

    /// Vector capability, when the store has one.
    fn vector_search(&self) -> Option<&dyn VectorSearch> {
        None
    }
}

#[async_trait]
/// Embedding-backed operations of a vector-capable store.
pub trait VectorSearch: Send + Sync {
    /// Embed the content and insert it.
    async fn add_document(&self, memory: NewMemory) -> Result<Memory, MemoryError>;

    /// Records matching `filter`, ranked by cosine similarity to `query`.
    async fn similarity_search(
        &self,
        query: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Width of vectors produced by [`VectorSearch::embed`].
    fn dimensions(&self) -> usize;
}

#[async_trait]
/// Text embedding backend.
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    fn dimensions(&self) -> usize;
}
