//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STATE_FILE: &str = "state/active_view.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bind address {value:?}: {source}")]
    InvalidBind {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,

    /// Campaign data directory.
    pub data_dir: PathBuf,

    /// Where the active view is saved. `None` keeps it in memory only.
    pub state_file: Option<PathBuf>,

    /// Bearer token required on GM routes. `None` leaves them open.
    pub gm_token: Option<String>,

    /// Obsidian vault holding CHARON's lore notes.
    pub vault_path: Option<PathBuf>,

    /// Model for CHARON; the client default when unset.
    pub charon_model: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            state_file: Some(PathBuf::from(DEFAULT_STATE_FILE)),
            gm_token: None,
            vault_path: None,
            charon_model: None,
        }
    }
}

impl ServerConfig {
    /// Config serving `data_dir` with everything else at its default.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read `MOTHERSHIP_*`, `OBSIDIAN_VAULT_PATH` and `CHARON_MODEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        if let Some(bind) = get("MOTHERSHIP_BIND") {
            config.bind = bind
                .parse()
                .map_err(|source| ConfigError::InvalidBind { value: bind, source })?;
        }
        if let Some(dir) = get("MOTHERSHIP_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = get("MOTHERSHIP_STATE_FILE") {
            config.state_file = Some(PathBuf::from(file));
        }
        config.gm_token = get("MOTHERSHIP_GM_TOKEN");
        config.vault_path = get("OBSIDIAN_VAULT_PATH").map(PathBuf::from);
        config.charon_model = get("CHARON_MODEL");
        Ok(config)
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// Keep the active view in memory only.
    pub fn in_memory(mut self) -> Self {
        self.state_file = None;
        self
    }

    pub fn with_gm_token(mut self, token: impl Into<String>) -> Self {
        self.gm_token = Some(token.into());
        self
    }

    pub fn with_vault_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vault_path = Some(path.into());
        self
    }

    pub fn with_charon_model(mut self, model: impl Into<String>) -> Self {
        self.charon_model = Some(model.into());
        self
    }
}
