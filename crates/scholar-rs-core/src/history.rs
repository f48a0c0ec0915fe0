//! Bounded per-session chat history.
//!
//! Sessions idle for longer than the TTL expire and the least recently used
//! session is evicted once capacity is reached.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use scholar_rs_memory::MessageRole;
use std::time::Duration;

/// One message of a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

impl Turn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// LRU + TTL cache of session turns.
#[derive(Clone)]
pub struct SessionHistory {
    sessions: Cache<String, Vec<Turn>>,
}

impl SessionHistory {
    /// `ttl` of zero keeps sessions until they are evicted by capacity.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(capacity.max(1) as u64)
            .eviction_policy(EvictionPolicy::lru());
        if !ttl.is_zero() {
            builder = builder.time_to_idle(ttl);
        }
        Self {
            sessions: builder.build(),
        }
    }

    /// Append a turn to the session, creating it when missing.
    pub fn push(&self, session_id: &str, turn: Turn) {
        self.sessions
            .entry(session_id.to_string())
            .and_upsert_with(|existing| {
                let mut turns = existing.map(|entry| entry.into_value()).unwrap_or_default();
                turns.push(turn);
                turns
            });
        self.sessions.run_pending_tasks();
    }

    pub fn get(&self, session_id: &str) -> Option<Vec<Turn>> {
        self.sessions.get(session_id)
    }

    /// Drop a session; true when it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Live sessions.
    pub fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHistory")
            .field("sessions", &self.sessions.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionHistory, Turn};
    use pretty_assertions::assert_eq;
    use scholar_rs_memory::MessageRole;
    use std::thread::sleep;
    use std::time::Duration;

    fn user(content: &str) -> Turn {
        Turn::new(MessageRole::User, content)
    }

    #[test]
    fn keeps_turns_in_order() {
        let history = SessionHistory::new(4, Duration::from_secs(60));
        history.push("s1", user("hello"));
        history.push("s1", Turn::new(MessageRole::Assistant, "hi"));
        assert_eq!(
            history.get("s1"),
            Some(vec![user("hello"), Turn::new(MessageRole::Assistant, "hi")])
        );
        assert!(history.clear("s1"));
        assert!(!history.clear("s1"));
        assert!(history.is_empty());
    }

    #[test]
    fn evicts_least_recently_used_session() {
        let history = SessionHistory::new(2, Duration::from_secs(60));
        history.push("a", user("1"));
        history.push("b", user("2"));
        assert!(history.get("a").is_some());
        history.push("c", user("3"));
        assert_eq!(history.len(), 2);
        assert!(history.get("b").is_none());
        assert!(history.get("a").is_some());
        assert!(history.get("c").is_some());
    }

    #[test]
    fn expires_idle_sessions() {
        let history = SessionHistory::new(8, Duration::from_millis(200));
        history.push("old", user("1"));
        sleep(Duration::from_millis(120));
        history.push("fresh", user("2"));
        sleep(Duration::from_millis(120));
        assert!(history.get("old").is_none());
        assert!(history.get("fresh").is_some());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        let history = SessionHistory::new(8, Duration::ZERO);
        history.push("s", user("1"));
        sleep(Duration::from_millis(50));
        assert!(history.get("s").is_some());
    }
}
