//! Campaign data and shared terminal state for a Mothership GM terminal.
//!
//! This crate provides:
//! - Loading of the campaign directory (locations, encounter maps, comm
//!   terminals, NPCs, ship, crew, session logs)
//! - The active view shown on the players' screen and the encounter
//!   operations the GM performs on it
//! - The broadcast message log
//! - CHARON, the station AI, with a GM approval queue
//!
//! # Quick Start
//!
//! ```ignore
//! use mothership_core::{ActiveView, CampaignLoader, Store, ViewType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = CampaignLoader::new("data");
//!     let store = Store::open("state/active_view.json").await;
//!
//!     let deck = loader.encounter_deck("veil-station", "")?;
//!     store
//!         .update_view(|view: &mut ActiveView| {
//!             view.switch_view(ViewType::EncounterMap, "veil-station", "");
//!             view.toggle_room_visibility("cargo", deck.as_ref())
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod active_view;
pub mod announce;
pub mod campaign;
pub mod charon;
pub mod messages;
pub mod persist;
pub mod store;
pub mod testing;

pub use active_view::{
    ActiveView, CharonMode, DoorStatus, PlaceToken, Token, TokenKind, ViewError, ViewType,
};
pub use announce::Announcer;
pub use campaign::{CampaignLoader, LoadError};
pub use charon::{Charon, CharonError, ClaudeResponder, Responder};
pub use messages::{BroadcastMessage, MessageError, MessageLog, Priority};
pub use persist::{PersistError, Snapshot};
pub use store::Store;
