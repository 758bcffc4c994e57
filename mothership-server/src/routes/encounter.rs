//! GM encounter controls: tokens, rooms, doors and decks.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mothership_core::{ActiveView, DoorStatus, PlaceToken, Token, ViewError};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub async fn place_token(
    State(state): State<SharedState>,
    Json(body): Json<PlaceToken>,
) -> Result<(StatusCode, Json<Token>), ApiError> {
    let deck = state.encounter_deck().await?;
    let (token, _) = state
        .store
        .update_view(|view| view.place_token(body, deck.as_ref()))
        .await?;
    info!(token = %token.id, x = token.x, y = token.y, "placed token");
    Ok((StatusCode::CREATED, Json(token)))
}

/// Partial token update. A lone `x` or `y` keeps the other coordinate.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateToken {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub status: Option<Vec<String>>,
}

pub async fn update_token(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateToken>,
) -> Result<Json<Token>, ApiError> {
    if body.x.is_none() && body.y.is_none() && body.status.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }
    let deck = state.encounter_deck().await?;
    let (token, _) = state
        .store
        .update_view(|view| {
            let current = view
                .encounter_tokens
                .get(&id)
                .cloned()
                .ok_or_else(|| ViewError::UnknownToken(id.clone()))?;

            let mut token = current.clone();
            if body.x.is_some() || body.y.is_some() {
                let x = body.x.unwrap_or(current.x);
                let y = body.y.unwrap_or(current.y);
                token = view.move_token(&id, x, y, deck.as_ref())?;
            }
            if let Some(status) = body.status {
                token = view.set_token_status(&id, status)?;
            }
            Ok::<_, ViewError>(token)
        })
        .await?;
    Ok(Json(token))
}

pub async fn remove_token(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Token>, ApiError> {
    let (token, _) = state
        .store
        .update_view(|view| view.remove_token(&id))
        .await?;
    info!(token = %id, "removed token");
    Ok(Json(token))
}

pub async fn toggle_room(
    State(state): State<SharedState>,
    Path(room): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deck = state.encounter_deck().await?;
    let (visible, _) = state
        .store
        .update_view(|view| view.toggle_room_visibility(&room, deck.as_ref()))
        .await?;
    info!(room = %room, visible, "toggled room");
    Ok(Json(json!({ "room_id": room, "visible": visible })))
}

#[derive(Debug, Deserialize)]
pub struct RoomVisibility {
    pub visible: bool,
}

pub async fn set_room(
    State(state): State<SharedState>,
    Path(room): Path<String>,
    Json(body): Json<RoomVisibility>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deck = state.encounter_deck().await?;
    state
        .store
        .update_view(|view| view.set_room_visibility(&room, body.visible, deck.as_ref()))
        .await?;
    Ok(Json(json!({ "room_id": room, "visible": body.visible })))
}

#[derive(Debug, Deserialize)]
pub struct DoorState {
    pub status: DoorStatus,
}

pub async fn set_door(
    State(state): State<SharedState>,
    Path(door): Path<String>,
    Json(body): Json<DoorState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deck = state.encounter_deck().await?;
    state
        .store
        .update_view(|view| view.set_door_status(&door, body.status, deck.as_ref()))
        .await?;
    info!(door = %door, status = ?body.status, "door status");
    Ok(Json(json!({ "door_id": door, "status": body.status })))
}

#[derive(Debug, Deserialize)]
pub struct SwitchDeck {
    pub deck_id: String,
    pub level: Option<u32>,
}

pub async fn switch_deck(
    State(state): State<SharedState>,
    Json(body): Json<SwitchDeck>,
) -> Result<Json<ActiveView>, ApiError> {
    let location = state.store.view().await.location_slug;
    if location.is_empty() {
        return Err(ApiError::BadRequest("No location selected".into()));
    }
    let manifest = state
        .load(move |loader| loader.encounter_manifest(&location))
        .await?;

    let (_, view) = state
        .store
        .update_view(|view| view.switch_deck(&body.deck_id, body.level, manifest.as_ref()))
        .await?;
    info!(deck = %view.encounter_deck_id, level = view.encounter_level, "switched deck");
    Ok(Json(view))
}
