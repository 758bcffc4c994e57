//! Shared state for the service: the active view and the broadcast log.
//!
//! Writers take the lock, apply their change to a copy, and only commit
//! it if the change succeeded. Every committed change is written to the
//! snapshot file (when there is one) and pushed to stream listeners.

use crate::active_view::ActiveView;
use crate::announce::Announcer;
use crate::messages::{BroadcastMessage, MessageError, MessageLog, Priority, SenderSummary};
use crate::persist::{PersistError, Snapshot};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

#[derive(Debug, Default)]
struct State {
    view: ActiveView,
    messages: MessageLog,
}

#[derive(Debug)]
pub struct Store {
    state: RwLock<State>,
    snapshot_path: Option<PathBuf>,
    announcer: Announcer<ActiveView>,
}

impl Store {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(State::default()),
            snapshot_path: None,
            announcer: Announcer::new(),
        }
    }

    /// A store backed by `path`. An existing snapshot is restored; a missing
    /// or unreadable one starts from a blank view.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match Snapshot::load_json(&path).await {
            Ok(snapshot) => {
                info!(
                    path = %path.display(),
                    revision = snapshot.active_view.revision,
                    messages = snapshot.messages.len(),
                    "restored active view"
                );
                State {
                    view: snapshot.active_view,
                    messages: snapshot.messages,
                }
            }
            Err(PersistError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => State::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unusable snapshot");
                State::default()
            }
        };

        Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
            announcer: Announcer::new(),
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// The full record, as the GM sees it.
    pub async fn view(&self) -> ActiveView {
        self.state.read().await.view.clone()
    }

    /// The record as players may see it.
    pub async fn player_view(&self) -> ActiveView {
        self.state.read().await.view.player_view()
    }

    /// Apply `change` to the active view. On success the view is touched,
    /// saved and announced; on error nothing changes.
    pub async fn update_view<T, E>(
        &self,
        change: impl FnOnce(&mut ActiveView) -> Result<T, E>,
    ) -> Result<(T, ActiveView), E> {
        let mut state = self.state.write().await;
        let mut draft = state.view.clone();
        let output = change(&mut draft)?;
        draft.touch();
        state.view = draft;

        self.persist(&state).await;
        self.announcer.announce(state.view.player_view());
        Ok((output, state.view.clone()))
    }

    pub async fn broadcast(
        &self,
        sender: Option<&str>,
        content: &str,
        priority: Option<Priority>,
    ) -> Result<BroadcastMessage, MessageError> {
        let mut state = self.state.write().await;
        let message = state.messages.broadcast(sender, content, priority)?;
        self.persist(&state).await;
        Ok(message)
    }

    pub async fn messages(&self, since: Option<u64>) -> Vec<BroadcastMessage> {
        self.state.read().await.messages.list(since)
    }

    pub async fn senders(&self) -> Vec<SenderSummary> {
        self.state.read().await.messages.senders()
    }

    pub async fn recent_messages(&self, n: usize) -> Vec<BroadcastMessage> {
        self.state.read().await.messages.recent(n)
    }

    /// Receive the player projection after every change.
    pub fn subscribe(&self) -> mpsc::Receiver<ActiveView> {
        self.announcer.listen()
    }

    pub fn listener_count(&self) -> usize {
        self.announcer.listener_count()
    }

    async fn persist(&self, state: &State) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let snapshot = Snapshot::new(state.view.clone(), state.messages.clone());
        if let Err(e) = snapshot.save_json(path).await {
            warn!(path = %path.display(), error = %e, "failed to save active view");
        }
    }
}
