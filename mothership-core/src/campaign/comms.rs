//! Comm terminals and their Markdown message archives.
//!
//! Messages are stored either centrally in `comms/messages/*.md` (each
//! terminal sees what was sent to or from its owner) or, in older
//! campaigns, per terminal under `inbox/<contact>/` and `sent/<contact>/`.

use super::{
    files_with_extension, parse_frontmatter, read_optional_yaml, sorted_entries,
    split_frontmatter, CampaignLoader, LoadError,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Conversation key for messages without a `conversation_id`.
pub const STANDALONE_CONVERSATION: &str = "__standalone__";

/// Contents of `terminal.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminalInfo {
    #[serde(default)]
    pub owner: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Terminal {
    pub slug: String,

    #[serde(flatten)]
    pub info: TerminalInfo,

    pub inbox: Vec<TerminalMessage>,
    pub sent: Vec<TerminalMessage>,

    /// Inbox and sent together, oldest first.
    pub messages: Vec<TerminalMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    Inbox,
    Sent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminalMessage {
    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<Folder>,

    /// The other party: sender for inbox messages, recipient for sent ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Frontmatter keys with special handling; everything else lands in `extra`.
#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    timestamp: Option<serde_yaml::Value>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default, deserialize_with = "scalar_id")]
    message_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_id")]
    conversation_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_id")]
    in_reply_to: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Ids written as bare YAML numbers (`message_id: 42`) are still ids.
fn scalar_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Parse a campaign timestamp: `YYYY-MM-DD HH:MM[:SS[.f]]`, the same with
/// a `T` separator, RFC 3339, or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let normalized = raw.replacen(' ', "T", 1);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn sort_by_timestamp(messages: &mut [TerminalMessage]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
}

fn mentions(field: Option<&str>, owner_lower: &str) -> bool {
    !owner_lower.is_empty() && field.is_some_and(|f| f.to_lowercase().contains(owner_lower))
}

impl CampaignLoader {
    /// Parse a message file with optional YAML frontmatter.
    pub fn parse_message_file(&self, path: &Path) -> Result<TerminalMessage, LoadError> {
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let (frontmatter, body) = split_frontmatter(&raw);
        let front: Frontmatter = parse_frontmatter(path, frontmatter)?;

        let timestamp = front.timestamp.as_ref().and_then(|value| match value {
            serde_yaml::Value::String(s) => parse_timestamp(s),
            _ => None,
        });

        Ok(TerminalMessage {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            content: body.to_string(),
            from: front.from,
            to: front.to,
            subject: front.subject,
            timestamp,
            priority: front.priority,
            message_id: front.message_id,
            conversation_id: front.conversation_id,
            in_reply_to: front.in_reply_to,
            folder: None,
            contact: None,
            extra: front.extra,
        })
    }

    /// All comm terminals of a location.
    pub fn load_terminals(&self, location_dir: &Path) -> Result<Vec<Terminal>, LoadError> {
        let comms = location_dir.join("comms");
        let mut terminals = Vec::new();
        for dir in sorted_entries(&comms)? {
            let is_store = dir.file_name().is_some_and(|n| n == "messages");
            if dir.is_dir() && !is_store {
                terminals.push(self.load_terminal(&dir)?);
            }
        }
        Ok(terminals)
    }

    /// Load one terminal and file its messages into inbox and sent.
    pub fn load_terminal(&self, terminal_dir: &Path) -> Result<Terminal, LoadError> {
        let slug = terminal_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let info = match read_optional_yaml::<TerminalInfo>(&terminal_dir.join("terminal.yaml"))? {
            Some(info) => info,
            None => TerminalInfo {
                owner: slug.clone(),
                ..TerminalInfo::default()
            },
        };

        let central = terminal_dir
            .parent()
            .map(|comms| comms.join("messages"))
            .filter(|dir| dir.is_dir());

        let (inbox, sent) = match central {
            Some(store) => {
                let all = self.load_central_messages(&store)?;
                (
                    filter_for_recipient(&all, &info.owner),
                    filter_for_sender(&all, &info.owner),
                )
            }
            None => (
                self.load_message_folder(&terminal_dir.join("inbox"), Folder::Inbox)?,
                self.load_message_folder(&terminal_dir.join("sent"), Folder::Sent)?,
            ),
        };

        let mut messages: Vec<TerminalMessage> = inbox.iter().chain(sent.iter()).cloned().collect();
        sort_by_timestamp(&mut messages);

        Ok(Terminal {
            slug,
            info,
            inbox,
            sent,
            messages,
        })
    }

    /// Terminal `terminal` of the location `location_slug`.
    pub fn find_terminal(&self, location_slug: &str, terminal: &str) -> Result<Option<Terminal>, LoadError> {
        super::check_slug(terminal)?;
        let Some(location_dir) = self.locate_dir(location_slug)? else {
            return Ok(None);
        };
        let dir = location_dir.join("comms").join(terminal);
        if !dir.is_dir() || terminal == "messages" {
            return Ok(None);
        }
        self.load_terminal(&dir).map(Some)
    }

    /// Every `*.md` in a central store, oldest first.
    pub fn load_central_messages(&self, store: &Path) -> Result<Vec<TerminalMessage>, LoadError> {
        let mut messages = files_with_extension(store, "md")?
            .iter()
            .map(|file| self.parse_message_file(file))
            .collect::<Result<Vec<_>, _>>()?;
        sort_by_timestamp(&mut messages);
        Ok(messages)
    }

    /// Legacy `inbox/` or `sent/` folder with one subdirectory per contact.
    fn load_message_folder(&self, folder_dir: &Path, folder: Folder) -> Result<Vec<TerminalMessage>, LoadError> {
        let mut messages = Vec::new();
        for contact_dir in sorted_entries(folder_dir)? {
            if !contact_dir.is_dir() {
                continue;
            }
            let contact = contact_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            for file in files_with_extension(&contact_dir, "md")? {
                let mut message = self.parse_message_file(&file)?;
                message.folder = Some(folder);
                message.contact = Some(contact.clone());
                messages.push(message);
            }
        }
        sort_by_timestamp(&mut messages);
        Ok(messages)
    }
}

fn filter_for_recipient(messages: &[TerminalMessage], owner: &str) -> Vec<TerminalMessage> {
    let owner = owner.to_lowercase();
    messages
        .iter()
        .filter(|m| mentions(m.to.as_deref(), &owner))
        .map(|m| TerminalMessage {
            folder: Some(Folder::Inbox),
            contact: Some(m.from.clone().unwrap_or_else(|| "Unknown".to_string())),
            ..m.clone()
        })
        .collect()
}

fn filter_for_sender(messages: &[TerminalMessage], owner: &str) -> Vec<TerminalMessage> {
    let owner = owner.to_lowercase();
    messages
        .iter()
        .filter(|m| mentions(m.from.as_deref(), &owner))
        .map(|m| TerminalMessage {
            folder: Some(Folder::Sent),
            contact: Some(m.to.clone().unwrap_or_else(|| "Unknown".to_string())),
            ..m.clone()
        })
        .collect()
}

/// Group messages by `conversation_id`, each group oldest first.
pub fn group_by_conversation(messages: &[TerminalMessage]) -> BTreeMap<String, Vec<TerminalMessage>> {
    let mut conversations: BTreeMap<String, Vec<TerminalMessage>> = BTreeMap::new();
    for message in messages {
        let key = message
            .conversation_id
            .clone()
            .unwrap_or_else(|| STANDALONE_CONVERSATION.to_string());
        conversations.entry(key).or_default().push(message.clone());
    }
    for thread in conversations.values_mut() {
        sort_by_timestamp(thread);
    }
    conversations
}

/// Messages of one conversation, oldest first.
pub fn conversation_thread(messages: &[TerminalMessage], conversation_id: &str) -> Vec<TerminalMessage> {
    let mut thread: Vec<TerminalMessage> = messages
        .iter()
        .filter(|m| m.conversation_id.as_deref() == Some(conversation_id))
        .cloned()
        .collect();
    sort_by_timestamp(&mut thread);
    thread
}

pub fn message_by_id<'a>(messages: &'a [TerminalMessage], message_id: &str) -> Option<&'a TerminalMessage> {
    messages
        .iter()
        .find(|m| m.message_id.as_deref() == Some(message_id))
}
