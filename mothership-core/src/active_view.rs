//! The active view: what the shared terminal is showing right now.
//!
//! One record per installation, mutated by GM actions and read by the
//! players' polling loop. Every mutation bumps `revision` so clients can
//! skip re-rendering unchanged state.

use crate::campaign::{DeckManifest, DeckMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from active-view operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("No token with id {0}")]
    UnknownToken(String),

    #[error("A token with id {0} is already placed")]
    DuplicateToken(String),

    #[error("Cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    #[error("The current map has no room {0}")]
    UnknownRoom(String),

    #[error("The current map has no door {0}")]
    UnknownDoor(String),

    #[error("The current map has no deck {0}")]
    UnknownDeck(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Which screen the shared terminal shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewType {
    #[default]
    Standby,
    Messages,
    CommTerminal,
    EncounterMap,
    ShipDashboard,
    GalaxyMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoorStatus {
    Open,
    Closed,
    Locked,
    Sealed,
    Damaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Player,
    Npc,
    Creature,
    Object,
}

/// Whether CHARON is just shown or accepts player queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharonMode {
    #[default]
    Display,
    Query,
}

/// A marker on the encounter grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub kind: TokenKind,

    #[serde(default)]
    pub name: String,

    /// Grid cell indices.
    pub x: u32,
    pub y: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    /// Deck the token was placed on; `None` for single-deck maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<String>,

    #[serde(default)]
    pub status: Vec<String>,

    /// NPC record this token stands for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc_id: Option<String>,
}

/// Request to place a token.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceToken {
    #[serde(default)]
    pub id: Option<String>,
    pub kind: TokenKind,
    #[serde(default)]
    pub name: String,
    pub x: u32,
    pub y: u32,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub npc_id: Option<String>,
}

fn default_level() -> u32 {
    1
}

fn default_channel() -> String {
    "story".to_string()
}

/// The singleton record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveView {
    #[serde(default)]
    pub view_type: ViewType,

    #[serde(default)]
    pub location_slug: String,

    #[serde(default)]
    pub view_slug: String,

    #[serde(default)]
    pub overlay_location_slug: String,

    #[serde(default)]
    pub overlay_terminal_slug: String,

    #[serde(default)]
    pub charon_mode: CharonMode,

    #[serde(default)]
    pub charon_location_path: String,

    #[serde(default)]
    pub charon_dialog_open: bool,

    #[serde(default = "default_channel")]
    pub charon_active_channel: String,

    #[serde(default = "default_level")]
    pub encounter_level: u32,

    #[serde(default)]
    pub encounter_deck_id: String,

    #[serde(default)]
    pub encounter_room_visibility: BTreeMap<String, bool>,

    #[serde(default)]
    pub encounter_door_status: BTreeMap<String, DoorStatus>,

    #[serde(default)]
    pub encounter_tokens: BTreeMap<String, Token>,

    /// Tiling order on screen.
    #[serde(default)]
    pub encounter_active_portraits: Vec<String>,

    #[serde(default)]
    pub ship_system_overrides: BTreeMap<String, String>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub revision: u64,
}

impl Default for ActiveView {
    fn default() -> Self {
        Self {
            view_type: ViewType::Standby,
            location_slug: String::new(),
            view_slug: String::new(),
            overlay_location_slug: String::new(),
            overlay_terminal_slug: String::new(),
            charon_mode: CharonMode::Display,
            charon_location_path: String::new(),
            charon_dialog_open: false,
            charon_active_channel: default_channel(),
            encounter_level: default_level(),
            encounter_deck_id: String::new(),
            encounter_room_visibility: BTreeMap::new(),
            encounter_door_status: BTreeMap::new(),
            encounter_tokens: BTreeMap::new(),
            encounter_active_portraits: Vec::new(),
            ship_system_overrides: BTreeMap::new(),
            updated_at: Utc::now(),
            revision: 0,
        }
    }
}

fn check_cell(map: Option<&DeckMap>, x: u32, y: u32) -> Result<(), ViewError> {
    match map {
        Some(map) if !map.in_bounds(x, y) => Err(ViewError::OutOfBounds {
            x,
            y,
            width: map.grid_size_x,
            height: map.grid_size_y,
        }),
        _ => Ok(()),
    }
}

fn room_for_cell(map: Option<&DeckMap>, x: u32, y: u32) -> Option<String> {
    map.and_then(|m| m.room_at(x, y)).map(|room| room.id.clone())
}

/// With a known map that lists rooms, `room` must be one of them.
fn check_room(map: Option<&DeckMap>, room: &str) -> Result<(), ViewError> {
    match map {
        Some(map) if !map.rooms.is_empty() && map.room(room).is_none() => {
            Err(ViewError::UnknownRoom(room.to_string()))
        }
        _ => Ok(()),
    }
}

fn check_door(map: Option<&DeckMap>, door: &str) -> Result<(), ViewError> {
    match map {
        Some(map) if !map.doors.is_empty() && map.door(door).is_none() => {
            Err(ViewError::UnknownDoor(door.to_string()))
        }
        _ => Ok(()),
    }
}

impl ActiveView {
    /// Record a mutation.
    pub fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
    }

    fn current_deck(&self) -> Option<String> {
        (!self.encounter_deck_id.is_empty()).then(|| self.encounter_deck_id.clone())
    }

    /// Deck a token on `map` sits on: the map's own deck id, else the
    /// selected deck.
    fn deck_for(&self, map: Option<&DeckMap>) -> Option<String> {
        map.and_then(|m| m.deck_id.clone()).or_else(|| self.current_deck())
    }

    fn reset_encounter(&mut self) {
        self.encounter_level = default_level();
        self.encounter_deck_id.clear();
        self.encounter_room_visibility.clear();
        self.encounter_door_status.clear();
        self.encounter_tokens.clear();
        self.encounter_active_portraits.clear();
    }

    /// Show a different screen. Moving to another location starts a fresh
    /// encounter there.
    pub fn switch_view(&mut self, view_type: ViewType, location_slug: &str, view_slug: &str) {
        if self.location_slug != location_slug {
            self.reset_encounter();
        }
        self.view_type = view_type;
        self.location_slug = location_slug.to_string();
        self.view_slug = view_slug.to_string();
    }

    /// Place a token on the current deck.
    pub fn place_token(&mut self, request: PlaceToken, map: Option<&DeckMap>) -> Result<Token, ViewError> {
        let id = match request.id {
            Some(id) if id.trim().is_empty() => return Err(ViewError::Empty("Token id")),
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };
        if self.encounter_tokens.contains_key(&id) {
            return Err(ViewError::DuplicateToken(id));
        }
        check_cell(map, request.x, request.y)?;

        let room_id = match request.room_id {
            Some(room) => {
                check_room(map, &room)?;
                Some(room)
            }
            None => room_for_cell(map, request.x, request.y),
        };

        let token = Token {
            id: id.clone(),
            kind: request.kind,
            name: request.name,
            x: request.x,
            y: request.y,
            room_id,
            deck_id: self.deck_for(map),
            status: request.status,
            npc_id: request.npc_id,
        };
        self.encounter_tokens.insert(id, token.clone());
        Ok(token)
    }

    /// Move a token to another cell; its room follows the map.
    pub fn move_token(&mut self, id: &str, x: u32, y: u32, map: Option<&DeckMap>) -> Result<Token, ViewError> {
        check_cell(map, x, y)?;
        let deck_id = self.deck_for(map);
        let token = self
            .encounter_tokens
            .get_mut(id)
            .ok_or_else(|| ViewError::UnknownToken(id.to_string()))?;
        token.x = x;
        token.y = y;
        if map.is_some() {
            token.room_id = room_for_cell(map, x, y);
            token.deck_id = deck_id;
        }
        Ok(token.clone())
    }

    pub fn set_token_status(&mut self, id: &str, status: Vec<String>) -> Result<Token, ViewError> {
        let token = self
            .encounter_tokens
            .get_mut(id)
            .ok_or_else(|| ViewError::UnknownToken(id.to_string()))?;
        token.status = status;
        Ok(token.clone())
    }

    pub fn remove_token(&mut self, id: &str) -> Result<Token, ViewError> {
        self.encounter_tokens
            .remove(id)
            .ok_or_else(|| ViewError::UnknownToken(id.to_string()))
    }

    /// Rooms the GM hasn't touched are visible.
    pub fn is_room_visible(&self, room: &str) -> bool {
        self.encounter_room_visibility
            .get(room)
            .copied()
            .unwrap_or(true)
    }

    /// Flip a room's visibility and return the new value.
    pub fn toggle_room_visibility(&mut self, room: &str, map: Option<&DeckMap>) -> Result<bool, ViewError> {
        let visible = !self.is_room_visible(room);
        self.set_room_visibility(room, visible, map)?;
        Ok(visible)
    }

    pub fn set_room_visibility(&mut self, room: &str, visible: bool, map: Option<&DeckMap>) -> Result<(), ViewError> {
        if room.is_empty() {
            return Err(ViewError::Empty("Room id"));
        }
        check_room(map, room)?;
        self.encounter_room_visibility
            .insert(room.to_string(), visible);
        Ok(())
    }

    pub fn set_door_status(&mut self, door: &str, status: DoorStatus, map: Option<&DeckMap>) -> Result<(), ViewError> {
        if door.is_empty() {
            return Err(ViewError::Empty("Door id"));
        }
        check_door(map, door)?;
        self.encounter_door_status.insert(door.to_string(), status);
        Ok(())
    }

    /// Show or hide an NPC portrait and return whether it is now shown.
    /// Newly shown portraits tile after the existing ones.
    pub fn toggle_portrait(&mut self, npc_id: &str) -> Result<bool, ViewError> {
        if npc_id.is_empty() {
            return Err(ViewError::Empty("NPC id"));
        }
        if let Some(index) = self
            .encounter_active_portraits
            .iter()
            .position(|id| id == npc_id)
        {
            self.encounter_active_portraits.remove(index);
            Ok(false)
        } else {
            self.encounter_active_portraits.push(npc_id.to_string());
            Ok(true)
        }
    }

    pub fn clear_portraits(&mut self) {
        self.encounter_active_portraits.clear();
    }

    /// Switch to another deck of a multi-deck map. The level comes from the
    /// request, else from the manifest, else stays as it was.
    pub fn switch_deck(&mut self, deck_id: &str, level: Option<u32>, manifest: Option<&DeckManifest>) -> Result<(), ViewError> {
        if deck_id.is_empty() {
            return Err(ViewError::Empty("Deck id"));
        }
        let entry = match manifest {
            Some(manifest) => Some(
                manifest
                    .deck(deck_id)
                    .ok_or_else(|| ViewError::UnknownDeck(deck_id.to_string()))?,
            ),
            None => None,
        };
        self.encounter_deck_id = deck_id.to_string();
        if let Some(level) = level.or_else(|| entry.and_then(|e| e.level)) {
            self.encounter_level = level;
        }
        Ok(())
    }

    pub fn set_ship_system(&mut self, system: &str, status: &str) -> Result<(), ViewError> {
        if system.is_empty() {
            return Err(ViewError::Empty("System name"));
        }
        if status.trim().is_empty() {
            return Err(ViewError::Empty("System status"));
        }
        self.ship_system_overrides
            .insert(system.to_string(), status.to_string());
        Ok(())
    }

    /// Drop a GM override; returns whether there was one.
    pub fn clear_ship_system(&mut self, system: &str) -> bool {
        self.ship_system_overrides.remove(system).is_some()
    }

    pub fn show_terminal_overlay(&mut self, location_slug: &str, terminal_slug: &str) -> Result<(), ViewError> {
        if terminal_slug.is_empty() {
            return Err(ViewError::Empty("Terminal slug"));
        }
        self.overlay_location_slug = location_slug.to_string();
        self.overlay_terminal_slug = terminal_slug.to_string();
        Ok(())
    }

    pub fn hide_terminal_overlay(&mut self) {
        self.overlay_location_slug.clear();
        self.overlay_terminal_slug.clear();
    }

    pub fn set_charon_mode(&mut self, mode: CharonMode) {
        self.charon_mode = mode;
    }

    pub fn set_charon_channel(&mut self, channel: &str) -> Result<(), ViewError> {
        if channel.trim().is_empty() {
            return Err(ViewError::Empty("Channel"));
        }
        self.charon_active_channel = channel.to_string();
        Ok(())
    }

    pub fn set_charon_dialog(&mut self, open: bool) {
        self.charon_dialog_open = open;
    }

    pub fn set_charon_location(&mut self, path: &str) {
        self.charon_location_path = path.trim_matches('/').to_string();
    }

    /// What players are allowed to see: tokens on other decks or in hidden
    /// rooms are dropped. Until a deck is selected the encounter is on the
    /// map's default deck, where every token was placed.
    pub fn player_view(&self) -> ActiveView {
        let mut view = self.clone();
        let current_deck = self.current_deck();
        view.encounter_tokens.retain(|_, token| {
            let on_deck = current_deck.is_none()
                || token.deck_id.is_none()
                || token.deck_id == current_deck;
            let in_view = token
                .room_id
                .as_deref()
                .map_or(true, |room| self.is_room_visible(room));
            on_deck && in_view
        });
        view
    }
}
