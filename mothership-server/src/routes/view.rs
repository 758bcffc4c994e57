//! The active view: player polling and stream, GM screen switching.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use mothership_core::{ActiveView, CharonMode, ViewType};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

pub async fn active_view(State(state): State<SharedState>) -> Json<ActiveView> {
    Json(state.store.player_view().await)
}

/// Push the player projection: the current view first, then every change.
pub async fn active_view_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let updates = state.store.subscribe();
    let current = state.store.player_view().await;

    let views = stream::once(async move { current }).chain(ReceiverStream::new(updates));
    let events = views.map(|view| Event::default().event("activeview").json_data(&view));
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn gm_active_view(State(state): State<SharedState>) -> Json<ActiveView> {
    Json(state.store.view().await)
}

#[derive(Debug, Deserialize)]
pub struct SwitchView {
    pub view_type: ViewType,
    #[serde(default)]
    pub location_slug: String,
    #[serde(default)]
    pub view_slug: String,
}

pub async fn switch_view(
    State(state): State<SharedState>,
    Json(body): Json<SwitchView>,
) -> Result<Json<ActiveView>, ApiError> {
    if !body.location_slug.is_empty() {
        let slug = body.location_slug.clone();
        state
            .load(move |loader| loader.locate_dir(&slug))
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Location {}", body.location_slug)))?;
    }

    let (_, view) = state
        .store
        .update_view(|view| {
            view.switch_view(body.view_type, &body.location_slug, &body.view_slug);
            Ok::<_, ApiError>(())
        })
        .await?;
    info!(view_type = ?view.view_type, location = %view.location_slug, "switched view");
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct ShowOverlay {
    pub location_slug: String,
    pub terminal_slug: String,
}

pub async fn show_overlay(
    State(state): State<SharedState>,
    Json(body): Json<ShowOverlay>,
) -> Result<Json<ActiveView>, ApiError> {
    let (location, terminal) = (body.location_slug.clone(), body.terminal_slug.clone());
    state
        .load(move |loader| loader.find_terminal(&location, &terminal))
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Terminal {}/{}",
                body.location_slug, body.terminal_slug
            ))
        })?;

    let (_, view) = state
        .store
        .update_view(|view| view.show_terminal_overlay(&body.location_slug, &body.terminal_slug))
        .await?;
    info!(terminal = %body.terminal_slug, "showing terminal overlay");
    Ok(Json(view))
}

pub async fn hide_overlay(State(state): State<SharedState>) -> Result<Json<ActiveView>, ApiError> {
    let (_, view) = state
        .store
        .update_view(|view| {
            view.hide_terminal_overlay();
            Ok::<_, ApiError>(())
        })
        .await?;
    Ok(Json(view))
}

/// Any subset of CHARON's display settings.
#[derive(Debug, Default, Deserialize)]
pub struct CharonState {
    pub mode: Option<CharonMode>,
    pub channel: Option<String>,
    pub dialog_open: Option<bool>,
    pub location_path: Option<String>,
}

pub async fn set_charon_state(
    State(state): State<SharedState>,
    Json(body): Json<CharonState>,
) -> Result<Json<ActiveView>, ApiError> {
    let (_, view) = state
        .store
        .update_view(|view| {
            if let Some(mode) = body.mode {
                view.set_charon_mode(mode);
            }
            if let Some(channel) = &body.channel {
                view.set_charon_channel(channel)?;
            }
            if let Some(open) = body.dialog_open {
                view.set_charon_dialog(open);
            }
            if let Some(path) = &body.location_path {
                view.set_charon_location(path);
            }
            Ok::<_, ApiError>(())
        })
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct SystemStatus {
    pub status: String,
}

pub async fn set_ship_system(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(body): Json<SystemStatus>,
) -> Result<Json<ActiveView>, ApiError> {
    let (_, view) = state
        .store
        .update_view(|view| view.set_ship_system(&name, &body.status))
        .await?;
    info!(system = %name, status = %body.status, "ship system override");
    Ok(Json(view))
}

pub async fn clear_ship_system(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<ActiveView>, ApiError> {
    let (_, view) = state
        .store
        .update_view(|view| {
            if view.clear_ship_system(&name) {
                Ok(())
            } else {
                Err(ApiError::not_found(format!("Override for {name}")))
            }
        })
        .await?;
    Ok(Json(view))
}

pub async fn toggle_portrait(
    State(state): State<SharedState>,
    Path(npc_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = npc_id.clone();
    state
        .load(move |loader| loader.load_npc(&id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("NPC {npc_id}")))?;

    let (shown, view) = state
        .store
        .update_view(|view| view.toggle_portrait(&npc_id))
        .await?;
    info!(npc = %npc_id, shown, "toggled portrait");
    Ok(Json(serde_json::json!({
        "npc_id": npc_id,
        "shown": shown,
        "active_portraits": view.encounter_active_portraits,
    })))
}

pub async fn clear_portraits(State(state): State<SharedState>) -> Result<Json<ActiveView>, ApiError> {
    let (_, view) = state
        .store
        .update_view(|view| {
            view.clear_portraits();
            Ok::<_, ApiError>(())
        })
        .await?;
    Ok(Json(view))
}
