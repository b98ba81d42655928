//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::derive_title;

/// Title shown when no session is open, and given to sessions that lost theirs.
pub const NEW_CHAT_TITLE: &str = "New chat";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Source text, never the rendered markup
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// A titled conversation thread
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
}

impl ChatSession {
    /// Create an empty session
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages: Vec::new(),
        }
    }

    /// Timestamp of the newest message, if any
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().map(|m| m.timestamp).max()
    }
}

/// Persisted shape of one session; the id is the key of the enclosing object.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    title: String,
    #[serde(default)]
    messages: Vec<Message>,
}

/// Ordered mapping from session id to session.
///
/// Insertion order is display order and survives a persist/restore cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMap {
    sessions: Vec<ChatSession>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Insert a session, replacing one with the same id in place.
    pub fn insert(&mut self, session: ChatSession) {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatSession> {
        self.sessions.iter()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// First id in stored order
    pub fn first_id(&self) -> Option<&str> {
        self.sessions.first().map(|s| s.id.as_str())
    }

    /// Id of the session whose newest message is the latest overall.
    /// Sessions without messages lose to any session with one.
    pub fn most_recent_id(&self) -> Option<&str> {
        self.sessions
            .iter()
            .enumerate()
            .max_by_key(|(index, s)| (s.last_activity(), std::cmp::Reverse(*index)))
            .map(|(_, s)| s.id.as_str())
    }

    /// Fresh time-derived id: milliseconds since the epoch, bumped past any
    /// id already present.
    pub fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut candidate = now.timestamp_millis();
        while self.contains(&candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    /// Serialize the whole mapping as one JSON object keyed by id.
    pub fn to_blob(&self) -> crate::Result<String> {
        let mut map = Map::new();
        for session in &self.sessions {
            let stored = StoredSession {
                title: session.title.clone(),
                messages: session.messages.clone(),
            };
            map.insert(session.id.clone(), serde_json::to_value(stored)?);
        }
        Ok(serde_json::to_string(&Value::Object(map))?)
    }

    /// Parse a blob written by [`SessionMap::to_blob`].
    ///
    /// Sessions stored with a blank title get one derived from their first
    /// user message so the non-empty title invariant holds after restore.
    pub fn from_blob(blob: &str) -> crate::Result<Self> {
        let map: Map<String, Value> = serde_json::from_str(blob)?;
        let mut sessions = Vec::with_capacity(map.len());

        for (id, value) in map {
            let stored: StoredSession = serde_json::from_value(value)?;
            let mut session = ChatSession {
                id,
                title: stored.title.trim().to_string(),
                messages: stored.messages,
            };
            if session.title.is_empty() {
                session.title = session
                    .messages
                    .iter()
                    .find(|m| m.sender == Sender::User)
                    .map(|m| derive_title(&m.text))
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| NEW_CHAT_TITLE.to_string());
            }
            sessions.push(session);
        }

        Ok(Self { sessions })
    }
}
