//! Snapshot persistence so the shared display survives a restart.

use crate::active_view::ActiveView;
use crate::messages::MessageLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current snapshot file version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to restore the display after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version for compatibility checking.
    pub version: u32,

    pub saved_at: DateTime<Utc>,

    pub active_view: ActiveView,

    #[serde(default)]
    pub messages: MessageLog,
}

impl Snapshot {
    pub fn new(active_view: ActiveView, messages: MessageLog) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            active_view,
            messages,
        }
    }

    /// Write to a JSON file, creating its directory if needed.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;

        // Check the version before the body so older layouts report a
        // mismatch instead of a field error.
        #[derive(Deserialize)]
        struct Header {
            version: u32,
        }
        let header: Header = serde_json::from_str(&content)?;
        if header.version != SNAPSHOT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: header.version,
            });
        }

        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::active_view::ViewType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("active_view.json");

        let mut view = ActiveView::default();
        view.switch_view(ViewType::EncounterMap, "veil-station", "");
        view.toggle_portrait("chen").unwrap();
        view.touch();
        let mut messages = MessageLog::new();
        messages.broadcast(None, "Docking clamps engaged.", None).unwrap();

        Snapshot::new(view.clone(), messages.clone())
            .save_json(&path)
            .await
            .unwrap();
        let loaded = Snapshot::load_json(&path).await.unwrap();

        assert_eq!(loaded.active_view.view_type, ViewType::EncounterMap);
        assert_eq!(loaded.active_view.encounter_active_portraits, vec!["chen"]);
        assert_eq!(loaded.active_view.revision, 1);
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages.list(None)[0].content, "Docking clamps engaged.");
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(&path, r#"{"version": 0, "layout": "legacy"}"#).unwrap();

        match Snapshot::load_json(&path).await {
            Err(PersistError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SNAPSHOT_VERSION);
                assert_eq!(found, 0);
            }
            other => panic!("expected version mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = Snapshot::load_json(dir.path().join("nope.json")).await;
        assert!(matches!(result, Err(PersistError::Io(_))));
    }
}
