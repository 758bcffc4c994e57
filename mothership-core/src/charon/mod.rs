//! CHARON, the station AI players can query from the shared terminal.
//!
//! A player query is recorded in the conversation and answered with an AI
//! draft that waits in the GM's approval queue. The GM approves (possibly
//! after editing), rejects, or bypasses the model by sending a line
//! directly.

mod ai;
mod knowledge;
mod session;

pub use ai::{
    CharonAi, CharonConfig, CharonInfo, ClaudeResponder, Prompt, Responder, HISTORY_LIMIT,
};
pub use knowledge::{
    apply_exclusions, compile_patterns, extract_sections, strip_wiki_links, ChainEntry,
    InstanceConfig, Knowledge, KnowledgeLoader, DEFAULT_EXCLUDE_PATTERNS,
};
pub use session::{CharonMessage, CharonSession, PendingResponse, Speaker, SESSION_TTL_HOURS};

use crate::campaign::CampaignLoader;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Cache key for an instance with no location.
const NO_LOCATION: &str = "__no_location__";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CharonError {
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("No pending response with id {0}")]
    UnknownPending(String),
}

/// Result of a player query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub query: CharonMessage,
    pub pending: PendingResponse,
}

pub struct Charon {
    loader: CampaignLoader,
    knowledge: KnowledgeLoader,
    responder: Option<Arc<dyn Responder>>,
    session: Mutex<CharonSession>,
    instances: Mutex<HashMap<String, Arc<CharonAi>>>,
}

impl std::fmt::Debug for Charon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Charon")
            .field("data_dir", &self.loader.data_dir())
            .field("ai_available", &self.responder.is_some())
            .finish_non_exhaustive()
    }
}

impl Charon {
    pub fn new(loader: CampaignLoader, vault: Option<PathBuf>, responder: Option<Arc<dyn Responder>>) -> Self {
        Self {
            knowledge: KnowledgeLoader::new(loader.clone(), vault),
            loader,
            responder,
            session: Mutex::new(CharonSession::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn ai_available(&self) -> bool {
        self.responder.is_some()
    }

    fn config_path(&self) -> PathBuf {
        self.loader.charon_dir().join("context.yaml")
    }

    /// The instance for `location_path`, built on first use.
    pub async fn instance(&self, location_path: &str) -> Arc<CharonAi> {
        let path = location_path.trim_matches('/');
        let key = if path.is_empty() { NO_LOCATION } else { path };

        let mut instances = self.instances.lock().await;
        if let Some(ai) = instances.get(key) {
            return ai.clone();
        }

        let config = CharonConfig::load(&self.config_path());
        let context = if path.is_empty() {
            String::new()
        } else {
            self.knowledge.context_for(path).unwrap_or_else(|e| {
                warn!(location = path, error = %e, "CHARON knowledge unavailable");
                String::new()
            })
        };
        let ai = Arc::new(CharonAi::new(config, context, self.responder.clone()));
        instances.insert(key.to_string(), ai.clone());
        ai
    }

    /// Forget cached instances so config and knowledge are re-read.
    pub async fn reload(&self) -> usize {
        let mut instances = self.instances.lock().await;
        let dropped = instances.len();
        instances.clear();
        info!(dropped, "reloaded CHARON instances");
        dropped
    }

    pub async fn info(&self, location_path: &str) -> CharonInfo {
        self.instance(location_path).await.info()
    }

    /// Record a player query and queue an AI draft for the GM.
    pub async fn query(&self, text: &str, location_path: &str) -> Result<QueryOutcome, CharonError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CharonError::EmptyQuery);
        }

        let (query, history) = {
            let mut session = self.session.lock().await;
            session.expire_if_idle(Utc::now());
            let history = session.conversation().to_vec();
            (session.add_message(Speaker::User, text), history)
        };

        // The model call happens without holding the session.
        let ai = self.instance(location_path).await;
        let draft = ai.generate(text, &history).await;

        let pending = self.session.lock().await.add_pending(&query, draft);
        info!(pending_id = %pending.pending_id, "CHARON draft awaiting approval");
        Ok(QueryOutcome { query, pending })
    }

    pub async fn conversation(&self) -> Vec<CharonMessage> {
        let mut session = self.session.lock().await;
        session.expire_if_idle(Utc::now());
        session.conversation().to_vec()
    }

    pub async fn pending(&self) -> Vec<PendingResponse> {
        let mut session = self.session.lock().await;
        session.expire_if_idle(Utc::now());
        session.pending().to_vec()
    }

    pub async fn approve(&self, pending_id: &str, edited: Option<String>) -> Result<CharonMessage, CharonError> {
        let edited = edited.filter(|text| !text.trim().is_empty());
        self.session
            .lock()
            .await
            .approve(pending_id, edited)
            .ok_or_else(|| CharonError::UnknownPending(pending_id.to_string()))
    }

    pub async fn reject(&self, pending_id: &str) -> Result<(), CharonError> {
        if self.session.lock().await.reject(pending_id) {
            Ok(())
        } else {
            Err(CharonError::UnknownPending(pending_id.to_string()))
        }
    }

    /// GM speaks as CHARON without a player query.
    pub async fn send(&self, text: &str) -> Result<CharonMessage, CharonError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CharonError::EmptyMessage);
        }
        let mut session = self.session.lock().await;
        session.expire_if_idle(Utc::now());
        Ok(session.add_message(Speaker::Charon, text))
    }

    pub async fn clear(&self) {
        self.session.lock().await.clear();
    }
}
