//! Session logs: `sessions/*.md` with YAML frontmatter.

use super::{
    check_slug, file_stem, files_with_extension, parse_frontmatter, split_frontmatter,
    CampaignLoader, LoadError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    #[serde(default)]
    pub slug: String,

    /// Session number, used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default)]
    pub body: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CampaignLoader {
    /// All session logs, by session number then file name. Unnumbered
    /// logs sort last.
    pub fn load_session_logs(&self) -> Result<Vec<SessionLog>, LoadError> {
        let dir = self.data_dir().join("sessions");
        let mut logs = files_with_extension(&dir, "md")?
            .iter()
            .map(|file| read_session_log(file))
            .collect::<Result<Vec<_>, _>>()?;
        logs.sort_by(|a, b| {
            (a.session.is_none(), a.session, &a.slug).cmp(&(b.session.is_none(), b.session, &b.slug))
        });
        Ok(logs)
    }

    pub fn load_session_log(&self, slug: &str) -> Result<Option<SessionLog>, LoadError> {
        let file = self
            .data_dir()
            .join("sessions")
            .join(format!("{}.md", check_slug(slug)?));
        if !file.is_file() {
            return Ok(None);
        }
        read_session_log(&file).map(Some)
    }
}

fn read_session_log(file: &Path) -> Result<SessionLog, LoadError> {
    let raw = std::fs::read_to_string(file).map_err(|e| LoadError::io(file, e))?;
    let (frontmatter, body) = split_frontmatter(&raw);
    let mut log: SessionLog = parse_frontmatter(file, frontmatter)?;
    log.slug = file_stem(file);
    log.body = body.trim().to_string();
    Ok(log)
}
