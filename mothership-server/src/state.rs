//! Shared state handed to every handler.

use crate::config::ServerConfig;
use crate::error::ApiError;
use mothership_core::campaign::DeckMap;
use mothership_core::{CampaignLoader, Charon, ClaudeResponder, LoadError, Responder, Store};
use std::sync::Arc;
use tracing::{info, warn};

pub struct AppState {
    pub config: ServerConfig,
    pub loader: CampaignLoader,
    pub store: Store,
    pub charon: Charon,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Store, responder: Option<Arc<dyn Responder>>) -> Self {
        let loader = CampaignLoader::new(&config.data_dir);
        let charon = Charon::new(loader.clone(), config.vault_path.clone(), responder);
        Self {
            config,
            loader,
            store,
            charon,
        }
    }

    /// Open the saved view and connect CHARON to Claude when a key is set.
    pub async fn from_config(config: ServerConfig) -> Self {
        let store = match &config.state_file {
            Some(path) => Store::open(path).await,
            None => Store::in_memory(),
        };

        let responder: Option<Arc<dyn Responder>> =
            match ClaudeResponder::from_env(config.charon_model.as_deref()) {
                Ok(responder) => {
                    info!("CHARON connected to Claude");
                    Some(Arc::new(responder))
                }
                Err(e) => {
                    warn!(error = %e, "CHARON running on fallback responses");
                    None
                }
            };

        Self::new(config, store, responder)
    }

    /// Run a blocking campaign read off the async workers.
    pub async fn load<T, F>(&self, read: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&CampaignLoader) -> Result<T, LoadError> + Send + 'static,
    {
        let loader = self.loader.clone();
        tokio::task::spawn_blocking(move || read(&loader))
            .await
            .map_err(|e| ApiError::Internal(format!("campaign read panicked: {e}")))?
            .map_err(ApiError::from)
    }

    /// The deck the current encounter is played on, if the location has a map.
    pub async fn encounter_deck(&self) -> Result<Option<DeckMap>, ApiError> {
        let view = self.store.view().await;
        self.load(move |loader| loader.encounter_deck(&view.location_slug, &view.encounter_deck_id))
            .await
    }
}

pub type SharedState = Arc<AppState>;
