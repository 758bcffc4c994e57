//! What a CHARON instance knows about where it is installed.
//!
//! Knowledge comes from three places: the `location.yaml` of every
//! location from the galaxy root down to the instance, the optional
//! `charon/instance.yaml` identity file, and a lore note in the GM's
//! Obsidian vault filtered down to the sections CHARON may quote.

use crate::campaign::{read_optional_yaml, CampaignLoader, LoadError, LocationInfo, LoreConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Headings never passed to CHARON unless a location overrides the list.
pub const DEFAULT_EXCLUDE_PATTERNS: [&str; 5] = [
    "GM Notes",
    "Secrets",
    "Session",
    "Adventure Hooks",
    "Campaign",
];

const DESCRIPTION_LIMIT: usize = 200;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));
static WIKI_LINK_ALIASED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)\|([^\]]+)\]\]").expect("valid regex"));
static WIKI_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid regex"));

/// `charon/instance.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearance_level: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl InstanceConfig {
    fn is_empty(&self) -> bool {
        self.instance_id.is_none() && self.clearance_level.is_none() && self.extra.is_empty()
    }
}

/// One step of the location chain.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    /// Galaxy path of this location.
    pub path: String,
    pub info: LocationInfo,
}

#[derive(Debug, Clone, Default)]
pub struct Knowledge {
    /// Root first.
    pub location_chain: Vec<ChainEntry>,
    pub lore: String,
    pub instance: Option<InstanceConfig>,
}

impl Knowledge {
    /// Render as the block appended to CHARON's system prompt.
    pub fn context_string(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        if let Some(instance) = self.instance.as_ref().filter(|i| !i.is_empty()) {
            lines.push("[SYSTEM IDENTITY]".into());
            lines.push(format!(
                "Instance ID: {}",
                instance.instance_id.as_deref().unwrap_or("UNKNOWN")
            ));
            lines.push(format!(
                "Clearance Level: {}",
                instance.clearance_level.as_deref().unwrap_or("PUBLIC")
            ));
            lines.push(String::new());
        }

        if !self.location_chain.is_empty() {
            lines.push("[LOCATION HIERARCHY]".into());
            for entry in &self.location_chain {
                let info = &entry.info;
                let kind = info.kind.as_deref().unwrap_or("unknown").to_uppercase();
                let name = if info.name.is_empty() { "Unknown" } else { info.name.as_str() };
                lines.push(format!("- {kind}: {name}"));
                if let Some(status) = &info.status {
                    lines.push(format!("  Status: {status}"));
                }
                if let Some(description) = &info.description {
                    lines.push(format!("  Info: {}", truncate(description, DESCRIPTION_LIMIT)));
                }
            }
            lines.push(String::new());
        }

        if !self.lore.is_empty() {
            lines.push("[DATABANK RECORDS]".into());
            lines.push(self.lore.clone());
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Loads [`Knowledge`] for a galaxy path.
#[derive(Debug, Clone)]
pub struct KnowledgeLoader {
    campaign: CampaignLoader,
    vault: Option<PathBuf>,
}

impl KnowledgeLoader {
    pub fn new(campaign: CampaignLoader, vault: Option<PathBuf>) -> Self {
        Self { campaign, vault }
    }

    /// Gather everything known at `location_path`, e.g.
    /// `anchor-system/veil-station`.
    pub fn load(&self, location_path: &str) -> Result<Knowledge, LoadError> {
        let slugs: Vec<&str> = location_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if slugs.is_empty() {
            return Ok(Knowledge::default());
        }

        let mut knowledge = Knowledge::default();
        for depth in 1..=slugs.len() {
            let prefix = &slugs[..depth];
            let Some(dir) = self.campaign.dir_for_path(prefix)? else {
                continue;
            };
            if let Some(info) = read_optional_yaml::<LocationInfo>(&dir.join("location.yaml"))? {
                knowledge.location_chain.push(ChainEntry {
                    path: prefix.join("/"),
                    info,
                });
            }
        }

        if let Some(dir) = self.campaign.dir_for_path(&slugs)? {
            knowledge.instance = read_optional_yaml(&dir.join("charon").join("instance.yaml"))?;
        }

        let leaf_path = slugs.join("/");
        let lore = knowledge
            .location_chain
            .last()
            .filter(|entry| entry.path == leaf_path)
            .and_then(|entry| entry.info.lore.clone());
        if let Some(lore) = lore {
            knowledge.lore = self.load_lore(&lore)?;
        }

        debug!(
            location = location_path,
            chain = knowledge.location_chain.len(),
            lore_bytes = knowledge.lore.len(),
            "loaded CHARON knowledge"
        );
        Ok(knowledge)
    }

    /// Shorthand for `load(path)?.context_string()`.
    pub fn context_for(&self, location_path: &str) -> Result<String, LoadError> {
        Ok(self.load(location_path)?.context_string())
    }

    fn load_lore(&self, lore: &LoreConfig) -> Result<String, LoadError> {
        let Some(vault) = &self.vault else {
            return Ok(String::new());
        };
        if lore.note.is_empty() {
            return Ok(String::new());
        }

        let Some(file) = note_file(vault, &lore.note) else {
            return Ok(format!("[LORE FILE NOT FOUND: {}]", lore.note));
        };
        let content = std::fs::read_to_string(&file).map_err(|source| LoadError::Io {
            path: file.clone(),
            source,
        })?;

        let patterns = match &lore.exclude_patterns {
            Some(patterns) => compile_patterns(patterns.iter().map(String::as_str)),
            None => compile_patterns(DEFAULT_EXCLUDE_PATTERNS.iter().copied()),
        };

        let filtered = if lore.charon_sections.is_empty() {
            apply_exclusions(&content, &patterns)
        } else {
            extract_sections(&content, &lore.charon_sections, &patterns)
        };
        Ok(strip_wiki_links(&filtered).trim().to_string())
    }
}

/// The note inside the vault, if it exists and doesn't climb out of it.
fn note_file(vault: &Path, note: &str) -> Option<PathBuf> {
    let relative = Path::new(note);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    let file = vault.join(relative);
    (!escapes && file.is_file()).then_some(file)
}

/// Compile heading patterns as case-insensitive, anchored at the start.
/// Invalid patterns are skipped.
pub fn compile_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Vec<Regex> {
    patterns
        .into_iter()
        .filter_map(|pattern| match Regex::new(&format!("(?i)^(?:{pattern})")) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern, error = %e, "ignoring invalid lore exclude pattern");
                None
            }
        })
        .collect()
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = HEADING.captures(line)?;
    let level = caps.get(1)?.as_str().len();
    let title = caps.get(2)?.as_str().trim();
    Some((level, title))
}

fn is_excluded(title: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|p| p.is_match(title))
}

/// Keep only the sections whose heading contains one of `allowed`
/// (case-insensitive), along with their deeper subsections.
pub fn extract_sections(content: &str, allowed: &[String], excluded: &[Regex]) -> String {
    let allowed: Vec<String> = allowed.iter().map(|a| a.to_lowercase()).collect();
    let mut kept = Vec::new();
    let mut section_level: Option<usize> = None;

    for line in content.split('\n') {
        match heading(line) {
            Some((_, title)) if is_excluded(title, excluded) => {
                section_level = None;
            }
            Some((level, title)) => {
                let lower = title.to_lowercase();
                if allowed.iter().any(|a| lower.contains(a.as_str())) {
                    section_level = Some(level);
                    kept.push(line);
                } else if section_level.is_some_and(|current| level > current) {
                    kept.push(line);
                } else {
                    section_level = None;
                }
            }
            None if section_level.is_some() => kept.push(line),
            None => {}
        }
    }
    kept.join("\n")
}

/// Drop excluded sections and everything nested under them.
pub fn apply_exclusions(content: &str, excluded: &[Regex]) -> String {
    let mut kept = Vec::new();
    let mut skip_below: Option<usize> = None;

    for line in content.split('\n') {
        match heading(line) {
            Some((level, title)) => {
                if is_excluded(title, excluded) {
                    skip_below = Some(level);
                    continue;
                }
                if let Some(skipped) = skip_below {
                    if level > skipped {
                        continue;
                    }
                    skip_below = None;
                }
                kept.push(line);
            }
            None if skip_below.is_none() => kept.push(line),
            None => {}
        }
    }
    kept.join("\n")
}

/// `[[Target|Shown]]` becomes `Shown`, `[[Target]]` becomes `Target`.
pub fn strip_wiki_links(content: &str) -> String {
    let aliased = WIKI_LINK_ALIASED.replace_all(content, "$2");
    WIKI_LINK.replace_all(&aliased, "$1").into_owned()
}
