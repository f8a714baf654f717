//! Chat sessions persisted under one storage key, capped at [`MAX_SESSIONS`].

pub mod storage;

use std::collections::BTreeMap;

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::web::models::{Message, Role};

pub use storage::{FileStore, KeyValueStore, MemoryStore};

pub const STORAGE_KEY: &str = "chatSessions";
pub const MAX_SESSIONS: usize = 20;
const TITLE_LIMIT: usize = 30;
const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored sessions are corrupt: {0}")]
    Corrupt(String),
    #[error("failed to serialize sessions: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    /// Milliseconds since the Unix epoch.
    pub last_updated: i64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            last_updated: Utc::now().timestamp_millis(),
        }
    }

    /// Appends a message and refreshes the derived title and timestamp.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.title = derive_title(&self.messages);
        self.last_updated = Utc::now().timestamp_millis();
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// First user message, cut to 30 characters with a trailing ellipsis.
pub fn derive_title(messages: &[Message]) -> String {
    let Some(first) = messages
        .iter()
        .filter(|message| message.role == Role::User)
        .map(|message| message.content.trim())
        .find(|content| !content.is_empty())
    else {
        return DEFAULT_TITLE.to_string();
    };

    if first.chars().count() > TITLE_LIMIT {
        let cut: String = first.chars().take(TITLE_LIMIT).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

type SessionMap = BTreeMap<String, ChatSession>;

pub struct SessionStore<S> {
    backend: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Upserts by id, evicts past the cap and re-persists the whole mapping.
    pub fn save(&mut self, mut session: ChatSession) -> Result<(), StoreError> {
        session.title = derive_title(&session.messages);

        let mut sessions = match self.read_all() {
            Ok(sessions) => sessions,
            Err(StoreError::Corrupt(reason)) => {
                warn!("Discarding corrupt session storage: {}", reason);
                SessionMap::new()
            }
            Err(err) => return Err(err),
        };

        sessions.insert(session.id.clone(), session);
        evict_oldest(&mut sessions);
        self.write_all(&sessions)
    }

    /// Drops everything beyond the newest [`MAX_SESSIONS`]; returns how many went.
    pub fn evict(&mut self) -> Result<usize, StoreError> {
        let mut sessions = self.read_all()?;
        let removed = evict_oldest(&mut sessions);
        if removed > 0 {
            self.write_all(&sessions)?;
        }
        Ok(removed)
    }

    pub fn load(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.read_all()?.remove(id))
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Result<Vec<ChatSession>, StoreError> {
        let mut sessions: Vec<ChatSession> = self.read_all()?.into_values().collect();
        sessions.sort_by(newest_first);
        Ok(sessions)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let mut sessions = self.read_all()?;
        if sessions.remove(id).is_none() {
            return Ok(false);
        }
        self.write_all(&sessions)?;
        Ok(true)
    }

    fn read_all(&self) -> Result<SessionMap, StoreError> {
        match self.backend.get(STORAGE_KEY)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|err| StoreError::Corrupt(err.to_string()))
            }
            None => Ok(SessionMap::new()),
        }
    }

    fn write_all(&mut self, sessions: &SessionMap) -> Result<(), StoreError> {
        let raw = serde_json::to_string(sessions)?;
        self.backend.set(STORAGE_KEY, raw)
    }
}

fn newest_first(a: &ChatSession, b: &ChatSession) -> std::cmp::Ordering {
    b.last_updated
        .cmp(&a.last_updated)
        .then_with(|| a.id.cmp(&b.id))
}

fn evict_oldest(sessions: &mut SessionMap) -> usize {
    if sessions.len() <= MAX_SESSIONS {
        return 0;
    }

    let mut ordered: Vec<&ChatSession> = sessions.values().collect();
    ordered.sort_by(|a, b| newest_first(a, b));
    let stale: Vec<String> = ordered[MAX_SESSIONS..]
        .iter()
        .map(|session| session.id.clone())
        .collect();

    for id in &stale {
        sessions.remove(id);
    }
    debug!("Evicted {} stale chat sessions", stale.len());
    stale.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, last_updated: i64) -> ChatSession {
        ChatSession {
            id: id.to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            last_updated,
        }
    }

    #[test]
    fn keeps_the_twenty_most_recent_of_twenty_five() {
        let mut store = SessionStore::new(MemoryStore::new());
        // 7 is coprime with 25, so this visits every timestamp once, out of order.
        for i in 0..25_i64 {
            let ts = (i * 7) % 25;
            store.save(session(&format!("s{ts}"), ts)).unwrap();
        }

        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), MAX_SESSIONS);
        assert_eq!(remaining[0].id, "s24");
        assert!(remaining.iter().all(|s| s.last_updated >= 5));
        for evicted in 0..5 {
            assert!(store.load(&format!("s{evicted}")).unwrap().is_none());
        }
    }

    #[test]
    fn save_upserts_by_id() {
        let mut store = SessionStore::new(MemoryStore::new());
        store.save(session("a", 1)).unwrap();

        let mut updated = session("a", 2);
        updated.push(Message::user("how do I report phishing?"));
        store.save(updated.clone()).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.load("a").unwrap(), Some(updated));
    }

    #[test]
    fn save_derives_the_title_from_messages() {
        let mut store = SessionStore::new(MemoryStore::new());
        let mut built = session("t", 7);
        built.messages = vec![
            Message::assistant("Hi there"),
            Message::user("What is two-factor authentication exactly?"),
        ];
        store.save(built).unwrap();

        let saved = store.load("t").unwrap().unwrap();
        assert_eq!(saved.title, "What is two-factor authenticat...");
        assert_eq!(saved.last_updated, 7);
    }

    #[test]
    fn persists_as_one_camel_case_json_object() {
        let mut store = SessionStore::new(MemoryStore::new());
        store.save(session("abc", 42)).unwrap();

        let raw = store.backend().get(STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["abc"]["lastUpdated"], 42);
        assert_eq!(value["abc"]["title"], "New Chat");
    }

    #[test]
    fn load_missing_returns_none() {
        let store = SessionStore::new(MemoryStore::new());
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn delete_removes_only_the_target() {
        let mut store = SessionStore::new(MemoryStore::new());
        store.save(session("a", 1)).unwrap();
        store.save(session("b", 2)).unwrap();

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn evict_trims_an_oversized_mapping() {
        let mut sessions = SessionMap::new();
        for i in 0..23 {
            sessions.insert(format!("s{i}"), session(&format!("s{i}"), i));
        }
        let mut backend = MemoryStore::new();
        backend
            .set(STORAGE_KEY, serde_json::to_string(&sessions).unwrap())
            .unwrap();

        let mut store = SessionStore::new(backend);
        assert_eq!(store.evict().unwrap(), 3);
        assert_eq!(store.evict().unwrap(), 0);
        assert!(store.load("s2").unwrap().is_none());
        assert!(store.load("s3").unwrap().is_some());
    }

    #[test]
    fn corrupt_storage_is_reported_then_replaced_on_save() {
        let mut backend = MemoryStore::new();
        backend.set(STORAGE_KEY, "{not json".to_string()).unwrap();
        let mut store = SessionStore::new(backend);

        assert!(matches!(store.load("x"), Err(StoreError::Corrupt(_))));
        store.save(session("x", 1)).unwrap();
        assert!(store.load("x").unwrap().is_some());
    }

    #[test]
    fn titles_come_from_the_first_user_message() {
        assert_eq!(derive_title(&[]), "New Chat");
        assert_eq!(
            derive_title(&[Message::assistant("welcome"), Message::user("short one")]),
            "short one"
        );
        let long = "What is the best way to secure my home router?";
        assert_eq!(
            derive_title(&[Message::user(long)]),
            "What is the best way to secure..."
        );
    }

    #[test]
    fn push_updates_title_and_timestamp() {
        let mut session = session("a", 0);
        session.push(Message::user("hello"));
        assert_eq!(session.title, "hello");
        assert!(session.last_updated > 0);
        assert!(!ChatSession::new().id.is_empty());
    }
}
