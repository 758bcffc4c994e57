//! The galaxy location tree.
//!
//! Every directory under `galaxy/` is a location; nesting in the file
//! system is nesting in the campaign (system → planet → station → ...).

use super::{
    check_slug, read_optional_yaml, sorted_entries, CampaignLoader, LoadError, LocationMap,
    Terminal,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subdirectories of a location that hold its data rather than children.
const RESERVED_DIRS: [&str; 4] = ["comms", "map", "maps", "charon"];

/// Contents of a `location.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub name: String,

    /// Free-form kind: system, planet, station, outpost, ship...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Obsidian note that CHARON may quote from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lore: Option<LoreConfig>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Which parts of a lore note CHARON is allowed to know.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoreConfig {
    /// Note path relative to the vault root.
    #[serde(default)]
    pub note: String,

    /// Headings to keep. Empty keeps everything not excluded.
    #[serde(default)]
    pub charon_sections: Vec<String>,

    /// Heading patterns (regex, case-insensitive, anchored) to drop.
    #[serde(default)]
    pub exclude_patterns: Option<Vec<String>>,
}

/// A loaded location with everything beneath it.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub slug: String,

    /// Slash-joined slugs from the galaxy root, e.g. `anchor-system/veil-station`.
    pub path: String,

    #[serde(flatten)]
    pub info: LocationInfo,

    pub map: Option<LocationMap>,
    pub has_map: bool,
    pub terminals: Vec<Terminal>,
    pub children: Vec<Location>,
}

impl Location {
    /// Depth-first search for `slug` in this subtree.
    pub fn find(&self, slug: &str) -> Option<&Location> {
        if self.slug == slug {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(slug))
    }

    /// Total number of locations in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Location::count).sum::<usize>()
    }
}

fn is_child_location(dir: &Path) -> bool {
    let Some(name) = dir.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    dir.is_dir() && !name.starts_with('.') && !name.starts_with("__") && !RESERVED_DIRS.contains(&name.as_ref())
}

impl CampaignLoader {
    /// Load every solar system and its nested locations.
    pub fn load_all_locations(&self) -> Result<Vec<Location>, LoadError> {
        let galaxy = self.galaxy_dir();
        let mut locations = Vec::new();
        for dir in sorted_entries(&galaxy)? {
            if is_child_location(&dir) {
                locations.push(self.load_location_dir(&dir)?);
            }
        }
        debug!(count = locations.len(), "loaded star systems");
        Ok(locations)
    }

    /// Load the location at `dir` and recurse into its children.
    pub fn load_location_dir(&self, dir: &Path) -> Result<Location, LoadError> {
        let slug = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut info: LocationInfo =
            read_optional_yaml(&dir.join("location.yaml"))?.unwrap_or_default();
        if info.name.is_empty() {
            info.name = slug.clone();
        }

        let map = self.load_map(dir)?;
        let terminals = self.load_terminals(dir)?;

        let mut children = Vec::new();
        for child in sorted_entries(dir)? {
            if is_child_location(&child) {
                children.push(self.load_location_dir(&child)?);
            }
        }

        Ok(Location {
            path: self.galaxy_path_of(dir),
            slug,
            info,
            has_map: map.is_some(),
            map,
            terminals,
            children,
        })
    }

    /// Find a location anywhere in the hierarchy.
    pub fn find_location(&self, slug: &str) -> Result<Option<Location>, LoadError> {
        match self.locate_dir(slug)? {
            Some(dir) => self.load_location_dir(&dir).map(Some),
            None => Ok(None),
        }
    }

    /// Slugs from the galaxy root down to `slug`.
    pub fn location_path(&self, slug: &str) -> Result<Option<Vec<String>>, LoadError> {
        Ok(self.locate_dir(slug)?.map(|dir| {
            self.galaxy_path_of(&dir)
                .split('/')
                .map(str::to_string)
                .collect()
        }))
    }

    /// Load a location by following a path of slugs from the galaxy root.
    pub fn location_by_path(&self, slugs: &[&str]) -> Result<Option<Location>, LoadError> {
        match self.dir_for_path(slugs)? {
            Some(dir) => self.load_location_dir(&dir).map(Some),
            None => Ok(None),
        }
    }

    /// Directory for a path of slugs, if it exists.
    pub fn dir_for_path(&self, slugs: &[&str]) -> Result<Option<PathBuf>, LoadError> {
        if slugs.is_empty() {
            return Ok(None);
        }
        let mut dir = self.galaxy_dir();
        for slug in slugs {
            dir.push(check_slug(slug)?);
        }
        Ok(dir.is_dir().then_some(dir))
    }

    /// Directory of the first location (depth-first, sorted) named `slug`.
    pub fn locate_dir(&self, slug: &str) -> Result<Option<PathBuf>, LoadError> {
        check_slug(slug)?;
        self.locate_in(&self.galaxy_dir(), slug)
    }

    fn locate_in(&self, parent: &Path, slug: &str) -> Result<Option<PathBuf>, LoadError> {
        for dir in sorted_entries(parent)? {
            if !is_child_location(&dir) {
                continue;
            }
            if dir.file_name().is_some_and(|n| n == slug) {
                return Ok(Some(dir));
            }
            if let Some(found) = self.locate_in(&dir, slug)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn galaxy_path_of(&self, dir: &Path) -> String {
        let galaxy = self.galaxy_dir();
        dir.strip_prefix(&galaxy)
            .unwrap_or(dir)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl CampaignLoader {
    /// Galaxy-level visualization data. Missing file yields an empty document.
    pub fn load_star_map(&self) -> Result<serde_json::Value, LoadError> {
        Ok(read_optional_yaml(&self.galaxy_dir().join("star_map.yaml"))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())))
    }

    /// Solar-system visualization for `system`.
    pub fn load_system_map(&self, system: &str) -> Result<Option<serde_json::Value>, LoadError> {
        let dir = self.galaxy_dir().join(check_slug(system)?);
        read_optional_yaml(&dir.join("system_map.yaml"))
    }

    /// Orbital visualization for `body` in `system`.
    pub fn load_orbit_map(&self, system: &str, body: &str) -> Result<Option<serde_json::Value>, LoadError> {
        let dir = self
            .galaxy_dir()
            .join(check_slug(system)?)
            .join(check_slug(body)?);
        read_optional_yaml(&dir.join("orbit_map.yaml"))
    }
}
