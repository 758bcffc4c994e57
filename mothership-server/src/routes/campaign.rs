//! Read-only campaign content.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Path, State};
use axum::Json;
use mothership_core::campaign::{
    conversation_thread, group_by_conversation, message_by_id, CrewMember, DeckMap, Location,
    LocationMap, Npc, SessionLog, ShipStatus, Terminal, TerminalMessage,
};
use serde_json::Value;
use std::collections::BTreeMap;

fn found<T>(value: Option<T>, what: impl FnOnce() -> String) -> Result<Json<T>, ApiError> {
    value.map(Json).ok_or_else(|| ApiError::not_found(what()))
}

pub async fn locations(State(state): State<SharedState>) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(state.load(|loader| loader.load_all_locations()).await?))
}

pub async fn location(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<Location>, ApiError> {
    let s = slug.clone();
    let location = state.load(move |loader| loader.find_location(&s)).await?;
    found(location, || format!("Location {slug}"))
}

pub async fn location_map(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<LocationMap>, ApiError> {
    let s = slug.clone();
    let map = state
        .load(move |loader| match loader.locate_dir(&s)? {
            Some(dir) => loader.load_map(&dir),
            None => Ok(None),
        })
        .await?;
    found(map, || format!("Map for {slug}"))
}

pub async fn location_deck(
    State(state): State<SharedState>,
    Path((slug, deck_id)): Path<(String, String)>,
) -> Result<Json<DeckMap>, ApiError> {
    let (s, d) = (slug.clone(), deck_id.clone());
    let deck = state
        .load(move |loader| match loader.locate_dir(&s)? {
            Some(dir) => loader.load_deck(&dir, &d),
            None => Ok(None),
        })
        .await?;
    found(deck, || format!("Deck {deck_id} of {slug}"))
}

async fn load_terminal(state: &SharedState, slug: String, terminal: String) -> Result<Terminal, ApiError> {
    let (s, t) = (slug.clone(), terminal.clone());
    state
        .load(move |loader| loader.find_terminal(&s, &t))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Terminal {slug}/{terminal}")))
}

pub async fn terminal(
    State(state): State<SharedState>,
    Path((slug, terminal)): Path<(String, String)>,
) -> Result<Json<Terminal>, ApiError> {
    Ok(Json(load_terminal(&state, slug, terminal).await?))
}

pub async fn terminal_conversations(
    State(state): State<SharedState>,
    Path((slug, terminal)): Path<(String, String)>,
) -> Result<Json<BTreeMap<String, Vec<TerminalMessage>>>, ApiError> {
    let terminal = load_terminal(&state, slug, terminal).await?;
    Ok(Json(group_by_conversation(&terminal.messages)))
}

pub async fn terminal_conversation(
    State(state): State<SharedState>,
    Path((slug, terminal, conversation)): Path<(String, String, String)>,
) -> Result<Json<Vec<TerminalMessage>>, ApiError> {
    let terminal = load_terminal(&state, slug, terminal).await?;
    let thread = conversation_thread(&terminal.messages, &conversation);
    if thread.is_empty() {
        return Err(ApiError::not_found(format!("Conversation {conversation}")));
    }
    Ok(Json(thread))
}

pub async fn terminal_message(
    State(state): State<SharedState>,
    Path((slug, terminal, message_id)): Path<(String, String, String)>,
) -> Result<Json<TerminalMessage>, ApiError> {
    let terminal = load_terminal(&state, slug, terminal).await?;
    found(message_by_id(&terminal.messages, &message_id).cloned(), || {
        format!("Message {message_id}")
    })
}

pub async fn star_map(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.load(|loader| loader.load_star_map()).await?))
}

pub async fn system_map(
    State(state): State<SharedState>,
    Path(system): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let s = system.clone();
    let map = state.load(move |loader| loader.load_system_map(&s)).await?;
    found(map, || format!("System {system}"))
}

pub async fn orbit_map(
    State(state): State<SharedState>,
    Path((system, body)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let (s, b) = (system.clone(), body.clone());
    let map = state.load(move |loader| loader.load_orbit_map(&s, &b)).await?;
    found(map, || format!("Body {system}/{body}"))
}

pub async fn npcs(State(state): State<SharedState>) -> Result<Json<Vec<Npc>>, ApiError> {
    Ok(Json(state.load(|loader| loader.load_npcs()).await?))
}

pub async fn npc(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Npc>, ApiError> {
    let i = id.clone();
    let npc = state.load(move |loader| loader.load_npc(&i)).await?;
    found(npc, || format!("NPC {id}"))
}

/// Ship status with the GM's system overrides applied.
pub async fn ship(State(state): State<SharedState>) -> Result<Json<ShipStatus>, ApiError> {
    let overrides = state.store.view().await.ship_system_overrides;
    let mut ship = state
        .load(|loader| loader.load_ship_status())
        .await?
        .ok_or_else(|| ApiError::not_found("Ship status"))?;
    ship.apply_overrides(&overrides);
    Ok(Json(ship))
}

pub async fn crew(State(state): State<SharedState>) -> Result<Json<Vec<CrewMember>>, ApiError> {
    Ok(Json(state.load(|loader| loader.load_crew()).await?))
}

pub async fn sessions(State(state): State<SharedState>) -> Result<Json<Vec<SessionLog>>, ApiError> {
    Ok(Json(state.load(|loader| loader.load_session_logs()).await?))
}

pub async fn session(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<SessionLog>, ApiError> {
    let s = slug.clone();
    let log = state.load(move |loader| loader.load_session_log(&s)).await?;
    found(log, || format!("Session {slug}"))
}
