//! CHARON: player queries and the GM approval queue.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mothership_core::charon::{CharonInfo, CharonMessage, PendingResponse, QueryOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Location for CHARON's knowledge: the request's own, else the one the GM set.
async fn location_path(state: &SharedState, requested: Option<String>) -> String {
    match requested {
        Some(path) => path,
        None => state.store.view().await.charon_location_path,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub location_path: Option<String>,
}

pub async fn config(
    State(state): State<SharedState>,
    Query(query): Query<LocationQuery>,
) -> Json<CharonInfo> {
    let path = location_path(&state, query.location_path).await;
    Json(state.charon.info(&path).await)
}

pub async fn conversation(State(state): State<SharedState>) -> Json<Vec<CharonMessage>> {
    Json(state.charon.conversation().await)
}

#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    pub query: String,
    pub location_path: Option<String>,
}

/// Players only get their own message back; the draft waits for the GM.
pub async fn query(
    State(state): State<SharedState>,
    Json(body): Json<PlayerQuery>,
) -> Result<(StatusCode, Json<CharonMessage>), ApiError> {
    let path = location_path(&state, body.location_path).await;
    let QueryOutcome { query, pending } = state.charon.query(&body.query, &path).await?;
    info!(pending_id = %pending.pending_id, location = %path, "CHARON query");
    Ok((StatusCode::ACCEPTED, Json(query)))
}

pub async fn pending(State(state): State<SharedState>) -> Json<Vec<PendingResponse>> {
    Json(state.charon.pending().await)
}

#[derive(Debug, Default, Deserialize)]
pub struct Approval {
    /// Replaces the draft when present.
    pub content: Option<String>,
}

pub async fn approve(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Option<Json<Approval>>,
) -> Result<Json<CharonMessage>, ApiError> {
    let edited = body.and_then(|Json(approval)| approval.content);
    let message = state.charon.approve(&id, edited).await?;
    info!(pending_id = %id, "approved CHARON response");
    Ok(Json(message))
}

pub async fn reject(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.charon.reject(&id).await?;
    info!(pending_id = %id, "rejected CHARON response");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub content: String,
}

pub async fn send(
    State(state): State<SharedState>,
    Json(body): Json<SendMessage>,
) -> Result<(StatusCode, Json<CharonMessage>), ApiError> {
    let message = state.charon.send(&body.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn clear(State(state): State<SharedState>) -> StatusCode {
    state.charon.clear().await;
    info!("cleared CHARON conversation");
    StatusCode::NO_CONTENT
}

pub async fn reload(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let dropped = state.charon.reload().await;
    Json(json!({ "reloaded": dropped }))
}
