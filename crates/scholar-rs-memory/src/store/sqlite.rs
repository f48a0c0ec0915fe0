//! SQLite memory store: relational always, vector capable with an embedder.

use super::{Embedder, MemoryStore, VectorSearch};
use crate::error::MemoryError;
use crate::model::{
    CourseDeletion, CourseMessage, Memory, MemoryFilter, MemoryId, MemoryKind, MemoryMetadata,
    MessageRole, NewMemory, ScoredMemory,
};
use crate::similarity::{cosine_similarity, decode_embedding, encode_embedding};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    course_id TEXT,
    user_id TEXT,
    kind TEXT NOT NULL DEFAULT 'chat',
    is_longterm INTEGER NOT NULL DEFAULT 0,
    embedding BLOB,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memories_course_user ON memories(course_id, user_id);
CREATE INDEX IF NOT EXISTS idx_memories_user_longterm ON memories(user_id, is_longterm);
CREATE UNIQUE INDEX IF NOT EXISTS idx_memories_course_summary
    ON memories(course_id, user_id) WHERE kind = 'course_summary';
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'model')),
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_course ON messages(course_id, created_at);
";

const MEMORY_COLUMNS: &str =
    "id, content, metadata, course_id, user_id, kind, is_longterm, embedding, created_at";

/// Long-term means both the column and the metadata flag are set.
const LONG_TERM_CLAUSE: &str =
    "(is_longterm = 1 AND COALESCE(json_extract(metadata, '$.isLongterm'), 0) = 1)";

/// SQLite-backed [`MemoryStore`].
///
/// Statements run on the blocking pool under one connection mutex. Embedding
/// calls happen before a statement is scheduled.
pub struct SqliteMemoryStore {
    conn: Arc<Mutex<Connection>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl std::fmt::Debug for SqliteMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMemoryStore")
            .field("vector_search", &self.embedder.is_some())
            .finish_non_exhaustive()
    }
}

impl SqliteMemoryStore {
    /// Open or create the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        info!("opened sqlite memory store (path={})", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, MemoryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, MemoryError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder: None,
        })
    }

    /// Enable the vector capability.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        info!(
            "enabled vector search on sqlite memory store (dimensions={})",
            embedder.dimensions()
        );
        self.embedder = Some(embedder);
        self
    }

    /// Raw `(column, metadata)` long-term flags of a row.
    pub fn long_term_flags(&self, id: MemoryId) -> Result<Option<(bool, bool)>, MemoryError> {
        let conn = self.conn.lock();
        let flags = conn
            .query_row(
                "SELECT is_longterm, json_extract(metadata, '$.isLongterm') FROM memories WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let column: bool = row.get(0)?;
                    let metadata: Option<i64> = row.get(1)?;
                    Ok((column, metadata == Some(1)))
                },
            )
            .optional()?;
        Ok(flags)
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, MemoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, MemoryError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || op(&mut *conn.lock())).await?
    }

    fn require_embedder(&self) -> Result<&Arc<dyn Embedder>, MemoryError> {
        self.embedder
            .as_ref()
            .ok_or(MemoryError::Unsupported("store has no embedder"))
    }
}

fn insert_row(conn: &Connection, mut memory: NewMemory) -> Result<Memory, MemoryError> {
    // Stored timestamps carry microseconds; keep the returned record identical.
    memory.created_at = truncate_to_micros(memory.created_at);
    let id = Uuid::new_v4();
    let metadata = memory.metadata();
    let metadata_json = serde_json::to_string(&metadata)?;
    let blob = memory.embedding.as_deref().map(encode_embedding);
    conn.execute(
        "INSERT INTO memories (id, content, metadata, course_id, user_id, kind, is_longterm, embedding, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id.to_string(),
            memory.content,
            metadata_json,
            memory.course_id,
            memory.user_id,
            memory.kind.as_str(),
            memory.is_longterm,
            blob,
            format_timestamp(memory.created_at),
        ],
    )?;
    debug!(
        "inserted memory (id={}, kind={}, long_term={})",
        id,
        memory.kind.as_str(),
        memory.is_longterm
    );
    Ok(Memory {
        id,
        content: memory.content,
        course_id: memory.course_id,
        user_id: memory.user_id,
        kind: memory.kind,
        is_longterm: memory.is_longterm,
        longterm_column: memory.is_longterm,
        metadata,
        embedding: memory.embedding,
        created_at: memory.created_at,
    })
}

fn select(
    conn: &Connection,
    filter: &MemoryFilter,
    limit: Option<usize>,
) -> Result<Vec<Memory>, MemoryError> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories
         WHERE (?1 IS NULL OR user_id = ?1)
           AND (?2 IS NULL OR course_id = ?2)
           AND (?3 = 0 OR {LONG_TERM_CLAUSE})
           AND (?4 IS NULL OR kind = ?4)
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?5"
    );
    let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![
                filter.user_id,
                filter.course_id,
                filter.long_term_only,
                filter.kind.map(|kind| kind.as_str()),
                limit,
            ],
            RawMemory::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(decode_rows(rows))
}

fn delete_course_rows(
    conn: &mut Connection,
    course_id: &str,
) -> Result<CourseDeletion, MemoryError> {
    let tx = conn.transaction()?;
    let deleted = tx.execute(
        &format!("DELETE FROM memories WHERE course_id = ?1 AND NOT {LONG_TERM_CLAUSE}"),
        params![course_id],
    )?;
    let detached = tx.execute(
        "UPDATE memories
         SET course_id = NULL, metadata = json_set(metadata, '$.courseId', NULL)
         WHERE course_id = ?1",
        params![course_id],
    )?;
    let deleted_messages =
        tx.execute("DELETE FROM messages WHERE course_id = ?1", params![course_id])?;
    tx.commit()?;
    Ok(CourseDeletion {
        deleted,
        detached,
        deleted_messages,
    })
}

fn select_messages(
    conn: &Connection,
    course_id: &str,
    limit: usize,
) -> Result<Vec<CourseMessage>, MemoryError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(
        "SELECT id, course_id, role, content, created_at FROM messages
         WHERE course_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![course_id, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.0.clone();
            match decode_message(row) {
                Ok(message) => Some(message),
                Err(err) => {
                    warn!("skipping malformed message row (id={id}): {err}");
                    None
                }
            }
        })
        .collect())
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn insert(&self, memory: NewMemory) -> Result<Memory, MemoryError> {
        self.with_conn(move |conn| insert_row(conn, memory)).await
    }

    async fn get(&self, id: MemoryId) -> Result<Option<Memory>, MemoryError> {
        let raw = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                        params![id.to_string()],
                        RawMemory::from_row,
                    )
                    .optional()?)
            })
            .await?;
        raw.map(RawMemory::decode).transpose()
    }

    async fn list(
        &self,
        filter: &MemoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Memory>, MemoryError> {
        let filter = filter.clone();
        let memories = self
            .with_conn(move |conn| select(conn, &filter, limit))
            .await?;
        debug!("listed {} memories", memories.len());
        Ok(memories)
    }

    async fn find_summary(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Option<Memory>, MemoryError> {
        let filter = MemoryFilter::default()
            .course(course_id)
            .user(user_id)
            .kind(MemoryKind::CourseSummary);
        let found = self
            .with_conn(move |conn| select(conn, &filter, Some(1)))
            .await?;
        Ok(found.into_iter().next())
    }

    async fn update_long_term(&self, id: MemoryId, long_term: bool) -> Result<(), MemoryError> {
        let updated = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "UPDATE memories
                     SET is_longterm = ?2, metadata = json_set(metadata, '$.isLongterm', json(?3))
                     WHERE id = ?1",
                    params![id.to_string(), long_term, long_term.to_string()],
                )?)
            })
            .await?;
        if updated == 0 {
            return Err(MemoryError::NotFound(id));
        }
        Ok(())
    }

    async fn update_content(
        &self,
        id: MemoryId,
        content: &str,
        embedding: Option<&[f32]>,
    ) -> Result<(), MemoryError> {
        let blob = embedding.map(encode_embedding);
        let content = content.to_string();
        let updated = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "UPDATE memories SET content = ?2, embedding = COALESCE(?3, embedding) WHERE id = ?1",
                    params![id.to_string(), content, blob],
                )?)
            })
            .await?;
        if updated == 0 {
            return Err(MemoryError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_course(&self, course_id: &str) -> Result<CourseDeletion, MemoryError> {
        let course = course_id.to_string();
        let deletion = self
            .with_conn(move |conn| delete_course_rows(conn, &course))
            .await?;
        info!(
            "deleted course memories (course={course_id}, deleted={}, detached={}, messages={})",
            deletion.deleted, deletion.detached, deletion.deleted_messages
        );
        Ok(deletion)
    }

    async fn append_message(&self, message: CourseMessage) -> Result<(), MemoryError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, course_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id.to_string(),
                    message.course_id,
                    message.role.as_str(),
                    message.content,
                    format_timestamp(message.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn recent_messages(
        &self,
        course_id: &str,
        limit: usize,
    ) -> Result<Vec<CourseMessage>, MemoryError> {
        let course = course_id.to_string();
        self.with_conn(move |conn| select_messages(conn, &course, limit))
            .await
    }

    fn vector_search(&self) -> Option<&dyn VectorSearch> {
        self.embedder.as_ref().map(|_| self as &dyn VectorSearch)
    }
}

#[async_trait]
impl VectorSearch for SqliteMemoryStore {
    async fn add_document(&self, memory: NewMemory) -> Result<Memory, MemoryError> {
        let embedding = VectorSearch::embed(self, &memory.content).await?;
        let memory = memory.with_embedding(embedding);
        self.with_conn(move |conn| insert_row(conn, memory)).await
    }

    async fn similarity_search(
        &self,
        query: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let needle = VectorSearch::embed(self, query).await?;
        let filter = filter.clone();
        let candidates = self
            .with_conn(move |conn| select(conn, &filter, None))
            .await?;
        let mut scored: Vec<ScoredMemory> = candidates
            .into_iter()
            .filter_map(|memory| {
                let score = cosine_similarity(&needle, memory.embedding.as_deref()?);
                Some(ScoredMemory { memory, score })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        debug!("similarity search returned {} memories", scored.len());
        Ok(scored)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let embedder = self.require_embedder()?;
        let vector = embedder.embed(text).await?;
        if vector.len() != embedder.dimensions() {
            return Err(MemoryError::Embedding(format!(
                "expected {} dimensions, got {}",
                embedder.dimensions(),
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.embedder
            .as_ref()
            .map_or(0, |embedder| embedder.dimensions())
    }
}

/// Row as read from SQLite, before domain decoding.
struct RawMemory {
    id: String,
    content: String,
    metadata: String,
    course_id: Option<String>,
    user_id: Option<String>,
    kind: String,
    is_longterm: bool,
    embedding: Option<Vec<u8>>,
    created_at: String,
}

impl RawMemory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            metadata: row.get(2)?,
            course_id: row.get(3)?,
            user_id: row.get(4)?,
            kind: row.get(5)?,
            is_longterm: row.get(6)?,
            embedding: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<Memory, MemoryError> {
        let metadata: MemoryMetadata = serde_json::from_str(&self.metadata)?;
        let kind = MemoryKind::parse(&self.kind)
            .ok_or_else(|| MemoryError::InvalidRecord(format!("unknown kind {}", self.kind)))?;
        let embedding = self.embedding.as_deref().map(decode_embedding).transpose()?;
        Ok(Memory {
            id: parse_id(&self.id)?,
            is_longterm: self.is_longterm && metadata.is_longterm,
            longterm_column: self.is_longterm,
            content: self.content,
            course_id: self.course_id,
            user_id: self.user_id,
            kind,
            metadata,
            embedding,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Decode rows, skipping the ones that fail.
fn decode_rows(rows: Vec<RawMemory>) -> Vec<Memory> {
    rows.into_iter()
        .filter_map(|raw| {
            let id = raw.id.clone();
            match raw.decode() {
                Ok(memory) => Some(memory),
                Err(err) => {
                    warn!("skipping malformed memory row (id={id}): {err}");
                    None
                }
            }
        })
        .collect()
}

fn decode_message(
    (id, course_id, role, content, created_at): (String, String, String, String, String),
) -> Result<CourseMessage, MemoryError> {
    let role = MessageRole::parse(&role)
        .ok_or_else(|| MemoryError::InvalidRecord(format!("unknown message role {role}")))?;
    Ok(CourseMessage {
        id: parse_id(&id)?,
        course_id,
        role,
        content,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_id(value: &str) -> Result<Uuid, MemoryError> {
    Uuid::parse_str(value).map_err(|err| MemoryError::InvalidRecord(format!("bad id {value}: {err}")))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, MemoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| MemoryError::InvalidRecord(format!("bad timestamp {value}: {err}")))
}

fn truncate_to_micros(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(value.timestamp_micros()).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::{MemoryStore, SqliteMemoryStore, VectorSearch};
    use crate::error::MemoryError;
    use crate::model::{CourseMessage, MemoryFilter, MemoryKind, MessageRole, NewMemory};
    use crate::store::Embedder;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use rusqlite::params;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Letter histogram; enough to make related texts score higher.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
            let mut vector = vec![0.0; 26];
            for ch in text.chars().filter(char::is_ascii_alphabetic) {
                vector[(ch.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
            }
            Ok(vector)
        }

        fn dimensions(&self) -> usize {
            26
        }
    }

    fn exchange(course: &str, user: &str, question: &str, minutes_ago: i64) -> NewMemory {
        let mut memory = NewMemory::exchange(course, question, "answer", Some(user), false);
        memory.created_at = Utc::now() - Duration::minutes(minutes_ago);
        memory
    }

    #[tokio::test]
    async fn insert_then_get_returns_same_record() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        let inserted = store
            .insert(NewMemory::exchange("c1", "q", "a", Some("u1"), true))
            .await
            .expect("insert");
        let fetched = store.get(inserted.id).await.expect("get").expect("row");
        assert_eq!(fetched, inserted);
        assert!(fetched.is_longterm);
        assert_eq!(store.long_term_flags(inserted.id).expect("flags"), Some((true, true)));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        store.insert(exchange("c1", "u1", "old", 10)).await.expect("insert");
        store.insert(exchange("c1", "u1", "new", 1)).await.expect("insert");
        store.insert(exchange("c1", "u2", "other user", 0)).await.expect("insert");
        store.insert(exchange("c2", "u1", "other course", 0)).await.expect("insert");

        let listed = store
            .list_for_course("c1", Some("u1"), None)
            .await
            .expect("list");
        let contents: Vec<_> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["USER: new\nAI: answer", "USER: old\nAI: answer"]);

        let everyone = store.list_for_course("c1", None, Some(2)).await.expect("list");
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn long_term_update_writes_both_flags() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        let memory = store.insert(exchange("c1", "u1", "q", 0)).await.expect("insert");
        assert_eq!(store.long_term_flags(memory.id).expect("flags"), Some((false, false)));

        store.update_long_term(memory.id, true).await.expect("promote");
        assert_eq!(store.long_term_flags(memory.id).expect("flags"), Some((true, true)));
        let long_term = store.list_long_term("u1", 5).await.expect("list");
        assert_eq!(long_term.len(), 1);
        assert!(long_term[0].metadata.is_longterm);

        store.update_long_term(memory.id, false).await.expect("demote");
        assert_eq!(store.long_term_flags(memory.id).expect("flags"), Some((false, false)));

        let missing = store.update_long_term(uuid::Uuid::new_v4(), true).await;
        assert!(matches!(missing, Err(MemoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn disagreeing_flags_read_as_short_term() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        let memory = store.insert(exchange("c1", "u1", "q", 0)).await.expect("insert");
        store
            .conn
            .lock()
            .execute(
                "UPDATE memories SET is_longterm = 1 WHERE id = ?1",
                params![memory.id.to_string()],
            )
            .expect("raw update");

        let fetched = store.get(memory.id).await.expect("get").expect("row");
        assert!(!fetched.is_longterm);
        assert!(fetched.longterm_column);
        assert!(fetched.has_long_term_flag());
        assert!(store.list_long_term("u1", 5).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn delete_course_detaches_long_term_memories() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        let short = store.insert(exchange("c1", "u1", "short", 2)).await.expect("insert");
        let long = store
            .insert(NewMemory::exchange("c1", "keep", "me", Some("u1"), true))
            .await
            .expect("insert");
        store
            .insert(NewMemory::summary("c1", "u1", "summary"))
            .await
            .expect("summary");
        store.insert(exchange("c2", "u1", "untouched", 0)).await.expect("insert");
        store
            .append_message(CourseMessage::new("c1", MessageRole::User, "hi"))
            .await
            .expect("message");

        let deletion = store.delete_course("c1").await.expect("delete");
        assert_eq!(deletion.deleted, 2);
        assert_eq!(deletion.detached, 1);
        assert_eq!(deletion.deleted_messages, 1);

        assert!(store.get(short.id).await.expect("get").is_none());
        let kept = store.get(long.id).await.expect("get").expect("kept");
        assert_eq!(kept.course_id, None);
        assert_eq!(kept.metadata.course_id, None);
        assert!(kept.is_longterm);
        assert_eq!(store.list_for_course("c2", None, None).await.expect("list").len(), 1);
        assert!(store.recent_messages("c1", 10).await.expect("messages").is_empty());
    }

    #[tokio::test]
    async fn one_summary_per_course_and_user() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        let summary = store
            .insert(NewMemory::summary("c1", "u1", "first"))
            .await
            .expect("summary");
        let duplicate = store.insert(NewMemory::summary("c1", "u1", "second")).await;
        assert!(matches!(duplicate, Err(MemoryError::Sqlite(_))));
        store
            .insert(NewMemory::summary("c1", "u2", "other user"))
            .await
            .expect("other user summary");

        store
            .update_content(summary.id, "revised", None)
            .await
            .expect("update");
        let found = store.find_summary("c1", "u1").await.expect("find").expect("summary");
        assert_eq!(found.id, summary.id);
        assert_eq!(found.content, "revised");
        assert_eq!(found.kind, MemoryKind::CourseSummary);
    }

    #[tokio::test]
    async fn malformed_rows_are_skipped() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        store.insert(exchange("c1", "u1", "fine", 0)).await.expect("insert");
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO memories (id, content, metadata, course_id, user_id, kind, is_longterm, created_at)
                 VALUES ('not-a-uuid', 'x', '{}', 'c1', 'u1', 'chat', 0, '2024-01-01T00:00:00.000000Z')",
                [],
            )
            .expect("raw insert");
        let listed = store.list_for_course("c1", None, None).await.expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn recent_messages_newest_first() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        for (offset, text) in ["one", "two", "three"].iter().enumerate() {
            let mut message = CourseMessage::new("c1", MessageRole::User, *text);
            message.created_at = Utc::now() + Duration::seconds(offset as i64);
            store.append_message(message).await.expect("append");
        }
        let recent = store.recent_messages("c1", 2).await.expect("recent");
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["three", "two"]);
    }

    #[tokio::test]
    async fn vector_capability_requires_embedder() {
        let store = SqliteMemoryStore::open_in_memory().expect("store");
        assert!(store.vector_search().is_none());
        let err = VectorSearch::embed(&store, "text").await.unwrap_err();
        assert!(matches!(err, MemoryError::Unsupported(_)));

        let store = store.with_embedder(Arc::new(LetterEmbedder));
        assert!(store.vector_search().is_some());
        assert_eq!(VectorSearch::dimensions(&store), 26);
    }

    #[tokio::test]
    async fn similarity_search_ranks_by_cosine() {
        let store = SqliteMemoryStore::open_in_memory()
            .expect("store")
            .with_embedder(Arc::new(LetterEmbedder));
        let vector = store.vector_search().expect("vector");
        vector
            .add_document(NewMemory::exchange("c1", "zzz", "zzz", Some("u1"), true))
            .await
            .expect("add");
        let close = vector
            .add_document(NewMemory::exchange("c1", "tuples", "tuples", Some("u1"), true))
            .await
            .expect("add");
        store
            .insert(NewMemory::exchange("c1", "tuples", "no vector", Some("u1"), true))
            .await
            .expect("insert");

        let filter = MemoryFilter::default().user("u1").long_term();
        let hits = vector
            .similarity_search("tuples", &filter, 5)
            .await
            .expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].memory.id, close.id);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn reopening_file_keeps_records() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("nested").join("memories.db");
        let id = {
            let store = SqliteMemoryStore::open(&path).expect("store");
            store.insert(exchange("c1", "u1", "q", 0)).await.expect("insert").id
        };
        let store = SqliteMemoryStore::open(&path).expect("reopen");
        assert!(store.get(id).await.expect("get").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_share_one_connection() {
        let store = Arc::new(SqliteMemoryStore::open_in_memory().expect("store"));
        let mut tasks = Vec::new();
        for n in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .insert(exchange("c1", "u1", &format!("q{n}"), n))
                    .await
                    .expect("insert");
                store.list_for_course("c1", None, None).await.expect("list").len()
            }));
        }
        for task in tasks {
            assert!(task.await.expect("join") >= 1);
        }
        let listed = store.list_for_course("c1", None, None).await.expect("list");
        assert_eq!(listed.len(), 8);
    }
}
