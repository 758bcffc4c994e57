//! The broadcast log.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use mothership_core::{BroadcastMessage, Priority};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Messages the GM console shows in its recent list.
pub const CONSOLE_RECENT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// Raw so that a malformed value is ignored instead of rejected.
    pub since: Option<String>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<MessagesQuery>,
) -> Json<serde_json::Value> {
    let since = query.since.and_then(|s| s.trim().parse::<u64>().ok());
    let messages = state.store.messages(since).await;
    Json(json!({ "count": messages.len(), "messages": messages }))
}

pub async fn senders(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({ "senders": state.store.senders().await }))
}

#[derive(Debug, Deserialize)]
pub struct Broadcast {
    pub sender: Option<String>,
    pub content: String,
    pub priority: Option<Priority>,
}

pub async fn broadcast(
    State(state): State<SharedState>,
    Json(body): Json<Broadcast>,
) -> Result<(StatusCode, Json<BroadcastMessage>), ApiError> {
    let message = state
        .store
        .broadcast(body.sender.as_deref(), &body.content, body.priority)
        .await?;
    info!(id = message.id, sender = %message.sender, priority = ?message.priority, "broadcast");
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn recent(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let messages = state.store.recent_messages(CONSOLE_RECENT).await;
    Json(json!({ "count": messages.len(), "messages": messages }))
}
