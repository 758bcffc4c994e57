//! NPCs, crew and the players' ship.

use super::{check_slug, file_stem, files_with_extension, read_optional_yaml, read_yaml, CampaignLoader, LoadError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An NPC record from `npcs/<id>.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Npc {
    /// File stem; the id used by the portrait list.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Portrait image relative to the data root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait_path: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A crew member from `crew/<slug>.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrewMember {
    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// `ship/status.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipStatus {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hull: Option<Gauge>,

    #[serde(default)]
    pub systems: BTreeMap<String, ShipSystem>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Gauge {
    pub current: i64,
    pub max: i64,
}

fn default_system_status() -> String {
    "ONLINE".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipSystem {
    #[serde(default = "default_system_status")]
    pub status: String,

    /// Percentage, when the campaign tracks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Set when the status shown comes from a GM override.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub overridden: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ShipStatus {
    /// Replace system statuses with GM overrides. Overrides for systems the
    /// file doesn't list add a new system.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) {
        for (name, status) in overrides {
            let system = self
                .systems
                .entry(name.clone())
                .or_insert_with(|| ShipSystem {
                    status: String::new(),
                    condition: None,
                    notes: None,
                    overridden: false,
                    extra: BTreeMap::new(),
                });
            system.status = status.clone();
            system.overridden = true;
        }
    }
}

impl CampaignLoader {
    pub fn load_npcs(&self) -> Result<Vec<Npc>, LoadError> {
        let dir = self.data_dir().join("npcs");
        files_with_extension(&dir, "yaml")?
            .iter()
            .map(|file| self.read_npc(file))
            .collect()
    }

    pub fn load_npc(&self, id: &str) -> Result<Option<Npc>, LoadError> {
        let file = self.data_dir().join("npcs").join(format!("{}.yaml", check_slug(id)?));
        if !file.is_file() {
            return Ok(None);
        }
        self.read_npc(&file).map(Some)
    }

    fn read_npc(&self, file: &std::path::Path) -> Result<Npc, LoadError> {
        let mut npc: Npc = read_yaml(file)?;
        let stem = file_stem(file);
        if npc.name.is_empty() {
            npc.name = stem.clone();
        }
        if npc.portrait_path.is_none() {
            if let Some(dir) = file.parent() {
                npc.portrait_path = self.find_image(dir, &stem);
            }
        }
        npc.id = stem;
        Ok(npc)
    }

    /// Crew roster sorted by name.
    pub fn load_crew(&self) -> Result<Vec<CrewMember>, LoadError> {
        let dir = self.data_dir().join("crew");
        let mut crew = files_with_extension(&dir, "yaml")?
            .iter()
            .map(|file| {
                let mut member: CrewMember = read_yaml(file)?;
                member.slug = file_stem(file);
                if member.name.is_empty() {
                    member.name = member.slug.clone();
                }
                Ok(member)
            })
            .collect::<Result<Vec<_>, LoadError>>()?;
        crew.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(crew)
    }

    pub fn load_ship_status(&self) -> Result<Option<ShipStatus>, LoadError> {
        read_optional_yaml(&self.data_dir().join("ship").join("status.yaml"))
    }
}
