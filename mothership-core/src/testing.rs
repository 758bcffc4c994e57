//! Testing utilities.
//!
//! - [`write_sample_campaign`] lays out a small but complete campaign
//!   directory: a multi-deck station with a central message store, a
//!   single-map outpost with a legacy terminal, NPCs, ship, crew and
//!   session logs
//! - [`write_sample_vault`] writes the Obsidian note the station's lore
//!   points at
//! - [`ScriptedResponder`] answers CHARON queries without API calls

use crate::charon::{Prompt, Responder};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

pub const SYSTEM: &str = "anchor-system";
pub const STATION: &str = "veil-station";
pub const STATION_PATH: &str = "anchor-system/veil-station";
pub const PLANET: &str = "kepler-b";
pub const OUTPOST: &str = "outpost-9";
pub const STATION_TERMINAL: &str = "commanders_terminal";
pub const OUTPOST_TERMINAL: &str = "lab_terminal";

/// Lore note path inside the sample vault.
pub const STATION_NOTE: &str = "Locations/Veil Station.md";

const FILES: &[(&str, &str)] = &[
    (
        "galaxy/star_map.yaml",
        "systems:\n  - {slug: anchor-system, name: Anchor System, position: [0, 0, 0]}\n",
    ),
    (
        "galaxy/anchor-system/location.yaml",
        "name: Anchor System\ntype: system\ndescription: A binary system on the edge of the Rim.\n",
    ),
    (
        "galaxy/anchor-system/system_map.yaml",
        "star: {name: Anchor, class: K2}\nbodies:\n  - {slug: kepler-b, orbit_au: 1.4}\n",
    ),
    (
        "galaxy/anchor-system/veil-station/location.yaml",
        "\
name: Veil Station
type: station
status: Operational
description: Orbital waystation and refinery.
lore:
  note: Locations/Veil Station.md
  charon_sections: [Overview, History]
",
    ),
    (
        "galaxy/anchor-system/veil-station/map/manifest.yaml",
        "\
name: Veil Station
decks:
  - {id: deck_1, name: Operations Deck, file: deck_1.yaml, level: 1, default: true}
  - {id: deck_2, name: Hangar Deck, file: deck_2.yaml, level: 2}
",
    ),
    (
        "galaxy/anchor-system/veil-station/map/deck_1.yaml",
        "\
name: Operations Deck
grid_size_x: 10
grid_size_y: 8
rooms:
  - {id: ops, name: Operations, x: 0, y: 0, width: 5, height: 4}
  - {id: cargo, name: Cargo Hold, x: 5, y: 0, width: 5, height: 4}
doors:
  - {id: ops-cargo, x: 5, y: 2, status: CLOSED, connects: [ops, cargo]}
",
    ),
    (
        "galaxy/anchor-system/veil-station/map/deck_1.png",
        "png",
    ),
    (
        "galaxy/anchor-system/veil-station/map/deck_2.yaml",
        "\
name: Hangar Deck
grid_size_x: 12
grid_size_y: 12
rooms:
  - {id: hangar, name: Hangar, x: 0, y: 0, width: 12, height: 8}
",
    ),
    (
        "galaxy/anchor-system/veil-station/comms/messages/001-chen-to-drake.md",
        "\
---
from: Dr. Chen
to: Commander Drake
subject: Reactor readings
timestamp: 2183-06-12 09:00:00
priority: HIGH
message_id: msg-001
conversation_id: reactor-leak
---
Coolant pressure is dropping in the secondary loop.
",
    ),
    (
        "galaxy/anchor-system/veil-station/comms/messages/002-drake-to-chen.md",
        "\
---
from: Commander Drake
to: Dr. Chen
subject: 'RE: Reactor readings'
timestamp: 2183-06-12T09:30
message_id: msg-002
conversation_id: reactor-leak
in_reply_to: msg-001
---
Keep it quiet. Nobody leaves the station.
",
    ),
    (
        "galaxy/anchor-system/veil-station/comms/messages/003-broadcast.md",
        "\
---
from: Station Control
to: Commander Drake, All Personnel
subject: Shift change
timestamp: 2183-06-11 18:00
---
Shift change at 2000 hours.
",
    ),
    (
        "galaxy/anchor-system/veil-station/comms/commanders_terminal/terminal.yaml",
        "owner: Commander Drake\nterminal_id: VS-CMD-01\naccess_level: COMMAND\n",
    ),
    (
        "galaxy/anchor-system/veil-station/charon/instance.yaml",
        "instance_id: CHARON-VEIL-7\nclearance_level: RESTRICTED\n",
    ),
    (
        "galaxy/anchor-system/kepler-b/location.yaml",
        "name: Kepler-B\ntype: planet\ndescription: Ice world with a thin methane atmosphere.\n",
    ),
    (
        "galaxy/anchor-system/kepler-b/orbit_map.yaml",
        "body: {name: Kepler-B, radius_km: 5200}\nsatellites: []\n",
    ),
    (
        "galaxy/anchor-system/kepler-b/outpost-9/location.yaml",
        "name: Outpost 9\ntype: outpost\nstatus: Silent\n",
    ),
    (
        "galaxy/anchor-system/kepler-b/outpost-9/map/outpost.yaml",
        "\
name: Outpost 9
grid_size_x: 6
grid_size_y: 6
rooms:
  - {id: lab, x: 0, y: 0, width: 3, height: 3}
",
    ),
    (
        "galaxy/anchor-system/kepler-b/outpost-9/comms/lab_terminal/inbox/dr-okafor/001.md",
        "\
---
from: Dr. Okafor
subject: Samples
timestamp: 2183-05-01 12:00
---
Do not open the cryo unit.
",
    ),
    (
        "galaxy/anchor-system/kepler-b/outpost-9/comms/lab_terminal/sent/dr-okafor/001.md",
        "Understood. Sealing the lab.\n",
    ),
    (
        "charon/context.yaml",
        "\
name: CHARON
designation: Station Operations Intelligence
version: 7.2.1
system_prompt: You are CHARON, the station AI of Veil Station. Answer in terse uppercase.
max_response_length: 300
temperature: 0.5
fallback_responses:
  - '[SIGNAL DEGRADED] QUERY CANNOT BE PROCESSED.'
",
    ),
    (
        "npcs/chen.yaml",
        "name: Dr. Mei Chen\nrole: Chief Engineer\nfaction: Hadley Corp\nstatus: Alive\n",
    ),
    ("npcs/chen.png", "png"),
    (
        "npcs/drake.yaml",
        "name: Commander Drake\nrole: Station Commander\nfaction: Hadley Corp\n",
    ),
    (
        "ship/status.yaml",
        "\
name: Tempest
class: Corvette
hull: {current: 32, max: 40}
systems:
  reactor: {status: ONLINE, condition: 92}
  life_support: {status: ONLINE}
  jump_drive: {status: OFFLINE, notes: Needs coolant}
",
    ),
    ("crew/vasquez.yaml", "name: Vasquez\nrole: Marine\n"),
    ("crew/ash.yaml", "name: Ash\nrole: Science Officer\nstatus: Stressed\n"),
    (
        "sessions/session-02.md",
        "---\nsession: 2\ntitle: The Silent Outpost\ndate: 2024-03-09\n---\nThe crew landed on Kepler-B.\n",
    ),
    (
        "sessions/session-01.md",
        "---\nsession: 1\ntitle: Arrival\ndate: 2024-03-02\n---\nThe Tempest docked at Veil Station.\n",
    ),
];

const VAULT_NOTE: &str = "\
# Veil Station

## Overview
Built by [[Hadley Corp|the company]] to refine [[Kepler-B]] ice.

### Docking
Four docking bays on the operations ring.

## GM Notes
The reactor is failing and Drake knows it.

## History
Commissioned in 2161.
";

fn write(root: &Path, relative: &str, content: &str) -> io::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Write the sample campaign under `data_dir`.
pub fn write_sample_campaign(data_dir: &Path) -> io::Result<()> {
    for (relative, content) in FILES {
        write(data_dir, relative, content)?;
    }
    Ok(())
}

/// Write the sample Obsidian vault under `vault_dir`.
pub fn write_sample_vault(vault_dir: &Path) -> io::Result<()> {
    write(vault_dir, STATION_NOTE, VAULT_NOTE)
}

/// A responder that replays scripted answers and records the prompts it
/// was given.
#[derive(Debug, Default)]
pub struct ScriptedResponder {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<Prompt>>,
    failing: bool,
}

impl ScriptedResponder {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// A responder whose every call fails like an API outage.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn respond(&self, prompt: Prompt) -> Result<String, claude::Error> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt);
        if self.failing {
            return Err(claude::Error::Api {
                status: 529,
                message: "overloaded".to_string(),
            });
        }
        Ok(self
            .answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| "NO FURTHER DATA.".to_string()))
    }
}
