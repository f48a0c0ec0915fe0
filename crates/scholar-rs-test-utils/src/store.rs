use async_trait::async_trait;
use scholar_rs_memory::{
    CourseDeletion, CourseMessage, Memory, MemoryError, MemoryFilter, MemoryId, MemoryStore,
    NewMemory, ScoredMemory, SqliteMemoryStore, VectorSearch,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps a SQLite store and injects failures on selected paths.
///
/// Also counts writes so tests can assert that an operation did not touch
/// storage.
#[derive(Debug)]
pub struct FaultyStore {
    inner: SqliteMemoryStore,
    fail_vector: bool,
    fail_inserts: bool,
    unavailable: bool,
    inserts: AtomicUsize,
    long_term_writes: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: SqliteMemoryStore) -> Self {
        Self {
            inner,
            fail_vector: false,
            fail_inserts: false,
            unavailable: false,
            inserts: AtomicUsize::new(0),
            long_term_writes: AtomicUsize::new(0),
        }
    }

    /// Every vector call fails; the capability is still advertised.
    pub fn failing_vector(mut self) -> Self {
        self.fail_vector = true;
        self
    }

    /// Relational inserts fail.
    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    /// Every relational call fails.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn inner(&self) -> &SqliteMemoryStore {
        &self.inner
    }

    /// Successful inserts on either path.
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn long_term_writes(&self) -> usize {
        self.long_term_writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), MemoryError> {
        if self.unavailable {
            return Err(MemoryError::InvalidRecord("store unavailable".to_string()));
        }
        Ok(())
    }

    fn inner_vector(&self) -> Result<&dyn VectorSearch, MemoryError> {
        if self.fail_vector {
            return Err(MemoryError::Embedding("vector path down".to_string()));
        }
        self.inner
            .vector_search()
            .ok_or(MemoryError::Unsupported("inner store has no embedder"))
    }
}

#[async_trait]
impl MemoryStore for FaultyStore {
    async fn insert(&self, memory: NewMemory) -> Result<Memory, MemoryError> {
        self.check()?;
        if self.fail_inserts {
            return Err(MemoryError::InvalidRecord("insert rejected".to_string()));
        }
        let memory = self.inner.insert(memory).await?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(memory)
    }

    async fn get(&self, id: MemoryId) -> Result<Option<Memory>, MemoryError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn list(
        &self,
        filter: &MemoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Memory>, MemoryError> {
        self.check()?;
        self.inner.list(filter, limit).await
    }

    async fn find_summary(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Option<Memory>, MemoryError> {
        self.check()?;
        self.inner.find_summary(course_id, user_id).await
    }

    async fn update_long_term(&self, id: MemoryId, long_term: bool) -> Result<(), MemoryError> {
        self.check()?;
        self.inner.update_long_term(id, long_term).await?;
        self.long_term_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_content(
        &self,
        id: MemoryId,
        content: &str,
        embedding: Option<&[f32]>,
    ) -> Result<(), MemoryError> {
        self.check()?;
        self.inner.update_content(id, content, embedding).await
    }

    async fn delete_course(&self, course_id: &str) -> Result<CourseDeletion, MemoryError> {
        self.check()?;
        self.inner.delete_course(course_id).await
    }

    async fn append_message(&self, message: CourseMessage) -> Result<(), MemoryError> {
        self.check()?;
        self.inner.append_message(message).await
    }

    async fn recent_messages(
        &self,
        course_id: &str,
        limit: usize,
    ) -> Result<Vec<CourseMessage>, MemoryError> {
        self.check()?;
        self.inner.recent_messages(course_id, limit).await
    }

    fn vector_search(&self) -> Option<&dyn VectorSearch> {
        if self.fail_vector || self.inner.vector_search().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl VectorSearch for FaultyStore {
    async fn add_document(&self, memory: NewMemory) -> Result<Memory, MemoryError> {
        let memory = self.inner_vector()?.add_document(memory).await?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(memory)
    }

    async fn similarity_search(
        &self,
        query: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.inner_vector()?
            .similarity_search(query, filter, limit)
            .await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.inner_vector()?.embed(text).await
    }

    fn dimensions(&self) -> usize {
        match self.inner.vector_search() {
            Some(vector) => vector.dimensions(),
            None => 8,
        }
    }
}
