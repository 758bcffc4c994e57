//! The CHARON conversation and the GM's approval queue.
//!
//! Lives in memory only. A session nobody has touched for [`SESSION_TTL_HOURS`]
//! is forgotten the next time it is used.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Idle time after which the conversation is dropped.
pub const SESSION_TTL_HOURS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Charon,
}

/// One line of the conversation shown on the players' terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharonMessage {
    pub message_id: String,
    pub role: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl CharonMessage {
    pub fn new(role: Speaker, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An AI draft waiting for the GM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingResponse {
    pub pending_id: String,

    /// The player message this answers.
    pub query_id: String,
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CharonSession {
    conversation: Vec<CharonMessage>,
    pending: Vec<PendingResponse>,
    last_activity: DateTime<Utc>,
}

impl Default for CharonSession {
    fn default() -> Self {
        Self {
            conversation: Vec::new(),
            pending: Vec::new(),
            last_activity: Utc::now(),
        }
    }
}

impl CharonSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &[CharonMessage] {
        &self.conversation
    }

    pub fn pending(&self) -> &[PendingResponse] {
        &self.pending
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Drop everything if the session has been idle past the TTL.
    /// Returns whether it expired.
    pub fn expire_if_idle(&mut self, now: DateTime<Utc>) -> bool {
        if now - self.last_activity < Duration::hours(SESSION_TTL_HOURS) {
            return false;
        }
        let had_state = !self.conversation.is_empty() || !self.pending.is_empty();
        self.clear();
        self.last_activity = now;
        had_state
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn add_message(&mut self, role: Speaker, content: impl Into<String>) -> CharonMessage {
        let message = CharonMessage::new(role, content);
        self.conversation.push(message.clone());
        self.touch();
        message
    }

    /// Queue a draft answer to `query` for approval.
    pub fn add_pending(&mut self, query: &CharonMessage, response: impl Into<String>) -> PendingResponse {
        let pending = PendingResponse {
            pending_id: Uuid::new_v4().to_string(),
            query_id: query.message_id.clone(),
            query: query.content.clone(),
            response: response.into(),
            timestamp: Utc::now(),
        };
        self.pending.push(pending.clone());
        self.touch();
        pending
    }

    /// Move a draft into the conversation, replacing its text with
    /// `edited` when given.
    pub fn approve(&mut self, pending_id: &str, edited: Option<String>) -> Option<CharonMessage> {
        let index = self.pending.iter().position(|p| p.pending_id == pending_id)?;
        let draft = self.pending.remove(index);
        Some(self.add_message(Speaker::Charon, edited.unwrap_or(draft.response)))
    }

    pub fn reject(&mut self, pending_id: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.pending_id != pending_id);
        self.touch();
        self.pending.len() != before
    }

    pub fn clear(&mut self) {
        self.conversation.clear();
        self.pending.clear();
    }
}
