//! Campaign content loaded from the data directory.
//!
//! Everything here is human-authored YAML or Markdown with YAML
//! frontmatter, read on demand. Nothing is cached: editing a file between
//! two requests is picked up by the second one.

mod comms;
mod location;
mod map;
mod roster;
mod session_log;

pub use comms::{
    conversation_thread, group_by_conversation, message_by_id, parse_timestamp, Folder,
    Terminal, TerminalInfo, TerminalMessage, STANDALONE_CONVERSATION,
};
pub use location::{Location, LocationInfo, LoreConfig};
pub use map::{DeckEntry, DeckManifest, DeckMap, Door, LocationMap, Room};
pub use roster::{CrewMember, Gauge, Npc, ShipStatus, ShipSystem};
pub use session_log::SessionLog;

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Image extensions searched, in order, next to maps and portraits.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Errors from loading campaign files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path segment: {0:?}")]
    InvalidSlug(String),
}

impl LoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reads campaign content from a data directory.
#[derive(Debug, Clone)]
pub struct CampaignLoader {
    data_dir: PathBuf,
}

impl CampaignLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Root of the location hierarchy. Solar systems live directly under it.
    pub fn galaxy_dir(&self) -> PathBuf {
        self.data_dir.join("galaxy")
    }

    pub(crate) fn charon_dir(&self) -> PathBuf {
        self.data_dir.join("charon")
    }

    /// Path of `file` relative to the data root, with forward slashes.
    pub(crate) fn relative(&self, file: &Path) -> String {
        file.strip_prefix(&self.data_dir)
            .unwrap_or(file)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Find an image sharing `stem` inside `dir`.
    pub(crate) fn find_image(&self, dir: &Path, stem: &str) -> Option<String> {
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|candidate| candidate.is_file())
            .map(|found| self.relative(&found))
    }
}

/// Reject slugs that could escape the data directory.
pub(crate) fn check_slug(slug: &str) -> Result<&str, LoadError> {
    let valid = !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
        && !slug.starts_with('.');
    if valid {
        Ok(slug)
    } else {
        Err(LoadError::InvalidSlug(slug.to_string()))
    }
}

/// Parse a YAML file. An empty file is treated as an empty mapping.
pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let source = if content.trim().is_empty() {
        "{}"
    } else {
        content.as_str()
    };
    serde_yaml::from_str(source).map_err(|source| LoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a YAML file if it exists.
pub(crate) fn read_optional_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LoadError> {
    if path.is_file() {
        read_yaml(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Sorted entries of a directory, or nothing if it doesn't exist.
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| LoadError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::io(dir, e))?;
    entries.sort();
    Ok(entries)
}

/// Files in `dir` with the given extension, sorted by name.
pub(crate) fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, LoadError> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == ext))
        .collect())
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Split a Markdown document into its YAML frontmatter and trimmed body.
///
/// A document that doesn't open with `---`, or whose frontmatter is never
/// closed, has no frontmatter and keeps its full text as the body.
pub(crate) fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    if let Some(rest) = content.strip_prefix("---") {
        if let Some(end) = rest.find("---") {
            return (Some(&rest[..end]), rest[end + 3..].trim());
        }
    }
    (None, content)
}

/// Parse frontmatter into `T`, treating a missing or blank block as empty.
pub(crate) fn parse_frontmatter<T: DeserializeOwned>(
    path: &Path,
    frontmatter: Option<&str>,
) -> Result<T, LoadError> {
    let source = match frontmatter {
        Some(block) if !block.trim().is_empty() => block,
        _ => "{}",
    };
    serde_yaml::from_str(source).map_err(|source| LoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
