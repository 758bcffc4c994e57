//! CHARON's voice: configuration, prompt assembly and the model call.

use super::session::{CharonMessage, Speaker};
use async_trait::async_trait;
use claude::{Claude, Message, Request};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Conversation messages sent along with each query.
pub const HISTORY_LIMIT: usize = 10;

const DEFAULT_FALLBACK: &str = "[SYSTEM ERROR] Unable to process query at this time.";

fn default_name() -> String {
    "CHARON".to_string()
}

fn default_system_prompt() -> String {
    "You are CHARON, a ship AI. Be terse and technical.".to_string()
}

fn default_max_response_length() -> usize {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_fallbacks() -> Vec<String> {
    vec![DEFAULT_FALLBACK.to_string()]
}

/// `data/charon/context.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharonConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Token limit for one answer.
    #[serde(default = "default_max_response_length")]
    pub max_response_length: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Canned answers used when the model can't be reached.
    #[serde(default = "default_fallbacks")]
    pub fallback_responses: Vec<String>,
}

impl Default for CharonConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            designation: None,
            version: None,
            system_prompt: default_system_prompt(),
            max_response_length: default_max_response_length(),
            temperature: default_temperature(),
            fallback_responses: default_fallbacks(),
        }
    }
}

impl CharonConfig {
    /// Read the config file, falling back to the built-in personality
    /// when it is missing or broken.
    pub fn load(path: &Path) -> Self {
        match crate::campaign::read_optional_yaml::<CharonConfig>(path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "using built-in CHARON config");
                Self::default()
            }
        }
    }

    pub fn fallback_response(&self) -> String {
        self.fallback_responses
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALLBACK.to_string())
    }
}

/// Public description of the running CHARON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharonInfo {
    pub name: String,
    pub designation: String,
    pub version: String,
    pub ai_available: bool,
}

/// Everything a model needs to draft one answer.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Something that drafts CHARON's answers.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, prompt: Prompt) -> Result<String, claude::Error>;
}

/// Drafts answers with the Claude API.
#[derive(Debug, Clone)]
pub struct ClaudeResponder {
    client: Claude,
}

impl ClaudeResponder {
    pub fn new(client: Claude) -> Self {
        Self { client }
    }

    /// Build from `ANTHROPIC_API_KEY`, using `model` when given.
    pub fn from_env(model: Option<&str>) -> Result<Self, claude::Error> {
        let mut client = Claude::from_env()?;
        if let Some(model) = model {
            client = client.with_model(model);
        }
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Responder for ClaudeResponder {
    async fn respond(&self, prompt: Prompt) -> Result<String, claude::Error> {
        let request = Request::new(prompt.messages)
            .with_system(prompt.system)
            .with_max_tokens(prompt.max_tokens)
            .with_temperature(prompt.temperature);
        let text = self.client.complete(request).await?.text();
        if text.trim().is_empty() {
            return Err(claude::Error::Parse("empty completion".to_string()));
        }
        Ok(text)
    }
}

/// CHARON as configured for one location.
pub struct CharonAi {
    config: CharonConfig,
    knowledge_context: String,
    responder: Option<Arc<dyn Responder>>,
}

impl std::fmt::Debug for CharonAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharonAi")
            .field("name", &self.config.name)
            .field("context_len", &self.knowledge_context.len())
            .field("ai_available", &self.responder.is_some())
            .finish()
    }
}

impl CharonAi {
    pub fn new(config: CharonConfig, knowledge_context: String, responder: Option<Arc<dyn Responder>>) -> Self {
        Self {
            config,
            knowledge_context,
            responder,
        }
    }

    pub fn config(&self) -> &CharonConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        self.responder.is_some()
    }

    pub fn info(&self) -> CharonInfo {
        CharonInfo {
            name: self.config.name.clone(),
            designation: self
                .config
                .designation
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            version: self
                .config
                .version
                .clone()
                .unwrap_or_else(|| "0.0.0".to_string()),
            ai_available: self.is_available(),
        }
    }

    /// The configured prompt followed by the location's databanks.
    pub fn system_prompt(&self) -> String {
        if self.knowledge_context.is_empty() {
            self.config.system_prompt.clone()
        } else {
            format!(
                "{}\n\n---\nYOUR DATABANKS CONTAIN:\n{}",
                self.config.system_prompt, self.knowledge_context
            )
        }
    }

    /// The prompt for `query` given the conversation so far.
    pub fn prompt(&self, query: &str, history: &[CharonMessage]) -> Prompt {
        let start = history.len().saturating_sub(HISTORY_LIMIT);
        let mut messages: Vec<Message> = history[start..]
            .iter()
            .map(|m| match m.role {
                Speaker::Charon => Message::assistant(m.content.clone()),
                Speaker::User => Message::user(m.content.clone()),
            })
            .collect();
        messages.push(Message::user(query));

        Prompt {
            system: self.system_prompt(),
            messages,
            max_tokens: self.config.max_response_length,
            temperature: self.config.temperature,
        }
    }

    /// Draft an answer. Never fails: without a model, or when the call
    /// errors, a fallback line is returned instead.
    pub async fn generate(&self, query: &str, history: &[CharonMessage]) -> String {
        let Some(responder) = &self.responder else {
            return self.config.fallback_response();
        };
        match responder.respond(self.prompt(query, history)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "CHARON model call failed, using fallback");
                self.config.fallback_response()
            }
        }
    }
}
