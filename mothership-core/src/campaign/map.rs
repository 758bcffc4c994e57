//! Encounter maps: single-deck files or multi-deck manifests.

use super::{file_stem, files_with_extension, read_optional_yaml, read_yaml, CampaignLoader, LoadError};
use crate::active_view::DoorStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const MANIFEST_FILE: &str = "manifest.yaml";

fn default_grid_size() -> u32 {
    20
}

/// `map/manifest.yaml` for a location with several decks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub decks: Vec<DeckEntry>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DeckManifest {
    pub fn deck(&self, deck_id: &str) -> Option<&DeckEntry> {
        self.decks.iter().find(|d| d.id == deck_id)
    }

    /// The deck flagged `default`, else the first one.
    pub fn default_deck(&self) -> Option<&DeckEntry> {
        self.decks
            .iter()
            .find(|d| d.default)
            .or_else(|| self.decks.first())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckEntry {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Deck file name inside `map/`.
    pub file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    #[serde(default)]
    pub default: bool,
}

/// One deck (or the only map) of an encounter location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckMap {
    #[serde(default)]
    pub slug: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_grid_size")]
    pub grid_size_x: u32,

    #[serde(default = "default_grid_size")]
    pub grid_size_y: u32,

    #[serde(default)]
    pub rooms: Vec<Room>,

    #[serde(default)]
    pub doors: Vec<Door>,

    /// Background image relative to the data root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DeckMap {
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.grid_size_x && y < self.grid_size_y
    }

    /// The room whose rectangle covers cell (x, y).
    pub fn room_at(&self, x: u32, y: u32) -> Option<&Room> {
        self.rooms.iter().find(|room| room.contains(x, y))
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    pub fn door(&self, id: &str) -> Option<&Door> {
        self.doors.iter().find(|door| door.id == id)
    }
}

/// A rectangular room in grid cells. A zero-sized room has no geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Room {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.width > 0
            && self.height > 0
            && x >= self.x
            && y >= self.y
            && x < self.x.saturating_add(self.width)
            && y < self.y.saturating_add(self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Door {
    pub id: String,

    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,

    /// Status before the GM touches it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DoorStatus>,

    /// Room ids on either side.
    #[serde(default)]
    pub connects: Vec<String>,
}

/// The map attached to a location.
#[derive(Debug, Clone, Serialize)]
pub struct LocationMap {
    pub is_multi_deck: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<DeckManifest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_deck_id: Option<String>,

    pub current_deck: DeckMap,
}

impl CampaignLoader {
    pub fn load_manifest(&self, location_dir: &Path) -> Result<Option<DeckManifest>, LoadError> {
        read_optional_yaml(&location_dir.join("map").join(MANIFEST_FILE))
    }

    /// Load one deck of a multi-deck location by id.
    pub fn load_deck(&self, location_dir: &Path, deck_id: &str) -> Result<Option<DeckMap>, LoadError> {
        let Some(manifest) = self.load_manifest(location_dir)? else {
            return Ok(None);
        };
        let Some(entry) = manifest.deck(deck_id) else {
            return Ok(None);
        };

        let map_dir = location_dir.join("map");
        let deck_file = map_dir.join(&entry.file);
        let Some(mut deck) = read_optional_yaml::<DeckMap>(&deck_file)? else {
            return Ok(None);
        };

        let stem = file_stem(&deck_file);
        deck.image_path = self.find_image(&map_dir, &stem);
        deck.slug = stem;
        deck.deck_id = Some(entry.id.clone());
        if deck.name.is_none() {
            deck.name = entry.name.clone();
        }
        Ok(Some(deck))
    }

    /// Load the map of a location: the default deck of a manifest if there
    /// is one, else the first map file in `map/`.
    pub fn load_map(&self, location_dir: &Path) -> Result<Option<LocationMap>, LoadError> {
        let map_dir = location_dir.join("map");
        if !map_dir.is_dir() {
            return Ok(None);
        }

        if let Some(manifest) = self.load_manifest(location_dir)? {
            if let Some(default_id) = manifest.default_deck().map(|d| d.id.clone()) {
                if let Some(deck) = self.load_deck(location_dir, &default_id)? {
                    return Ok(Some(LocationMap {
                        is_multi_deck: true,
                        manifest: Some(manifest),
                        current_deck_id: Some(default_id),
                        current_deck: deck,
                    }));
                }
            }
        }

        let Some(map_file) = files_with_extension(&map_dir, "yaml")?
            .into_iter()
            .find(|p| p.file_name().is_some_and(|n| n != MANIFEST_FILE))
        else {
            return Ok(None);
        };

        let mut deck: DeckMap = read_yaml(&map_file)?;
        let stem = file_stem(&map_file);
        deck.image_path = self.find_image(&map_dir, &stem);
        deck.slug = stem;

        Ok(Some(LocationMap {
            is_multi_deck: false,
            manifest: None,
            current_deck_id: None,
            current_deck: deck,
        }))
    }

    /// The deck an encounter at `location_slug` is being played on: the
    /// named deck when one is selected, else the location's default map.
    pub fn encounter_deck(&self, location_slug: &str, deck_id: &str) -> Result<Option<DeckMap>, LoadError> {
        if location_slug.is_empty() {
            return Ok(None);
        }
        let Some(dir) = self.locate_dir(location_slug)? else {
            return Ok(None);
        };
        if !deck_id.is_empty() {
            if let Some(deck) = self.load_deck(&dir, deck_id)? {
                return Ok(Some(deck));
            }
        }
        Ok(self.load_map(&dir)?.map(|map| map.current_deck))
    }

    /// Deck manifest for the location, if it has several decks.
    pub fn encounter_manifest(&self, location_slug: &str) -> Result<Option<DeckManifest>, LoadError> {
        if location_slug.is_empty() {
            return Ok(None);
        }
        match self.locate_dir(location_slug)? {
            Some(dir) => self.load_manifest(&dir),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, x: u32, y: u32, width: u32, height: u32) -> Room {
        Room {
            id: id.to_string(),
            name: None,
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_room_contains() {
        let ops = room("ops", 2, 2, 3, 2);
        assert!(ops.contains(2, 2));
        assert!(ops.contains(4, 3));
        assert!(!ops.contains(5, 3));
        assert!(!ops.contains(4, 4));
        assert!(!ops.contains(1, 2));
    }

    #[test]
    fn test_zero_sized_room_contains_nothing() {
        assert!(!room("void", 0, 0, 0, 0).contains(0, 0));
    }

    #[test]
    fn test_deck_defaults() {
        let deck: DeckMap = serde_yaml::from_str("name: Bridge\n").unwrap();
        assert_eq!(deck.grid_size_x, 20);
        assert_eq!(deck.grid_size_y, 20);
        assert!(deck.in_bounds(19, 19));
        assert!(!deck.in_bounds(20, 0));
    }

    #[test]
    fn test_manifest_default_deck() {
        let manifest: DeckManifest = serde_yaml::from_str(
            "decks:\n  - {id: upper, file: upper.yaml}\n  - {id: lower, file: lower.yaml, default: true}\n",
        )
        .unwrap();
        assert_eq!(manifest.default_deck().unwrap().id, "lower");

        let no_flag: DeckManifest =
            serde_yaml::from_str("decks:\n  - {id: upper, file: upper.yaml}\n").unwrap();
        assert_eq!(no_flag.default_deck().unwrap().id, "upper");
    }
}
