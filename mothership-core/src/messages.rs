//! Broadcast messages shown on the players' MESSAGES screen.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Sender used when the GM leaves it blank.
pub const DEFAULT_SENDER: &str = "CHARON";

/// Most messages returned by one poll.
pub const LIST_LIMIT: usize = 50;

pub const MAX_SENDER_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Sender is longer than 100 characters")]
    SenderTooLong,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn serialize_created_at<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&at.format(CREATED_AT_FORMAT).to_string())
}

fn deserialize_created_at<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    NaiveDateTime::parse_from_str(&raw, CREATED_AT_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub id: u64,
    pub sender: String,
    pub content: String,
    pub priority: Priority,

    #[serde(
        serialize_with = "serialize_created_at",
        deserialize_with = "deserialize_created_at"
    )]
    pub created_at: DateTime<Utc>,
}

/// Per-sender message count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderSummary {
    pub sender: String,
    pub count: usize,
}

/// The message log, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<BroadcastMessage>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. A blank sender becomes [`DEFAULT_SENDER`].
    pub fn broadcast(
        &mut self,
        sender: Option<&str>,
        content: &str,
        priority: Option<Priority>,
    ) -> Result<BroadcastMessage, MessageError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MessageError::EmptyContent);
        }
        let sender = match sender.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => DEFAULT_SENDER,
        };
        if sender.chars().count() > MAX_SENDER_LEN {
            return Err(MessageError::SenderTooLong);
        }

        // Restored logs may predate `next_id`.
        let floor = self.messages.last().map_or(0, |m| m.id);
        self.next_id = self.next_id.max(floor) + 1;

        let message = BroadcastMessage {
            id: self.next_id,
            sender: sender.to_string(),
            content: content.to_string(),
            priority: priority.unwrap_or_default(),
            created_at: Utc::now(),
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Messages after `since`, at most the latest [`LIST_LIMIT`], oldest first.
    pub fn list(&self, since: Option<u64>) -> Vec<BroadcastMessage> {
        let newer: Vec<_> = self
            .messages
            .iter()
            .filter(|m| since.map_or(true, |since| m.id > since))
            .collect();
        let skip = newer.len().saturating_sub(LIST_LIMIT);
        newer.into_iter().skip(skip).cloned().collect()
    }

    /// Senders with their message counts, most recently active first.
    pub fn senders(&self) -> Vec<SenderSummary> {
        let mut summaries: Vec<SenderSummary> = Vec::new();
        for message in self.messages.iter().rev() {
            match summaries.iter_mut().find(|s| s.sender == message.sender) {
                Some(summary) => summary.count += 1,
                None => summaries.push(SenderSummary {
                    sender: message.sender.clone(),
                    count: 1,
                }),
            }
        }
        summaries
    }

    /// The last `n` messages, newest first.
    pub fn recent(&self, n: usize) -> Vec<BroadcastMessage> {
        self.messages.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
