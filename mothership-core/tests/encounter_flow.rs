//! A GM running an encounter on the sample station, as seen by players
//! polling the shared terminal.

use mothership_core::active_view::{PlaceToken, TokenKind, ViewError, ViewType};
use mothership_core::campaign::CampaignLoader;
use mothership_core::testing::{self, STATION};
use mothership_core::{DoorStatus, Priority, Store};
use tempfile::TempDir;

fn token(id: &str, kind: TokenKind, x: u32, y: u32) -> PlaceToken {
    PlaceToken {
        id: Some(id.to_string()),
        kind,
        name: id.to_string(),
        x,
        y,
        room_id: None,
        status: Vec::new(),
        npc_id: None,
    }
}

fn campaign() -> (TempDir, CampaignLoader) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    testing::write_sample_campaign(dir.path()).expect("Failed to write campaign");
    let loader = CampaignLoader::new(dir.path());
    (dir, loader)
}

#[tokio::test]
async fn test_placed_token_visible_on_next_poll() {
    let (_dir, loader) = campaign();
    let store = Store::in_memory();
    let deck = loader.encounter_deck(STATION, "").unwrap();

    store
        .update_view(|view| {
            view.switch_view(ViewType::EncounterMap, STATION, "");
            view.place_token(token("alien", TokenKind::Creature, 7, 2), deck.as_ref())
        })
        .await
        .unwrap();

    let polled = store.player_view().await;
    let alien = &polled.encounter_tokens["alien"];
    assert_eq!((alien.x, alien.y), (7, 2));
    assert_eq!(alien.kind, TokenKind::Creature);
    assert!(alien.status.is_empty());
    assert_eq!(alien.room_id.as_deref(), Some("cargo"));
}

#[tokio::test]
async fn test_hiding_room_hides_its_tokens() {
    let (_dir, loader) = campaign();
    let store = Store::in_memory();
    let deck = loader.encounter_deck(STATION, "").unwrap();

    store
        .update_view(|view| {
            view.switch_view(ViewType::EncounterMap, STATION, "");
            view.place_token(token("alien", TokenKind::Creature, 7, 2), deck.as_ref())?;
            view.place_token(token("vasquez", TokenKind::Player, 1, 1), deck.as_ref())
        })
        .await
        .unwrap();

    store
        .update_view(|view| view.set_room_visibility("cargo", false, deck.as_ref()))
        .await
        .unwrap();

    let polled = store.player_view().await;
    assert!(!polled.encounter_tokens.contains_key("alien"));
    assert!(polled.encounter_tokens.contains_key("vasquez"));
    assert!(!polled.encounter_room_visibility["cargo"]);

    let gm = store.view().await;
    assert!(gm.encounter_tokens.contains_key("alien"));
}

#[tokio::test]
async fn test_portrait_toggle_twice_restores_list() {
    let store = Store::in_memory();
    store
        .update_view(|view| {
            view.toggle_portrait("chen")?;
            view.toggle_portrait("drake")
        })
        .await
        .unwrap();
    let before = store.view().await.encounter_active_portraits;

    for _ in 0..2 {
        store
            .update_view(|view| view.toggle_portrait("ripley"))
            .await
            .unwrap();
    }

    assert_eq!(store.view().await.encounter_active_portraits, before);
}

#[tokio::test]
async fn test_broadcasts_in_submission_order_with_priority() {
    let store = Store::in_memory();
    store
        .broadcast(Some("Station Control"), "Docking approved.", Some(Priority::Low))
        .await
        .unwrap();
    store
        .broadcast(None, "HULL BREACH DETECTED.", Some(Priority::Critical))
        .await
        .unwrap();

    let polled = store.messages(None).await;
    assert_eq!(polled.len(), 2);
    assert_eq!(polled[0].content, "Docking approved.");
    assert_eq!(polled[0].priority, Priority::Low);
    assert_eq!(polled[1].sender, "CHARON");
    assert_eq!(polled[1].priority, Priority::Critical);

    let since_first = store.messages(Some(polled[0].id)).await;
    assert_eq!(since_first.len(), 1);
}

#[tokio::test]
async fn test_deck_switch_and_doors() {
    let (_dir, loader) = campaign();
    let store = Store::in_memory();
    let manifest = loader.encounter_manifest(STATION).unwrap();

    store
        .update_view(|view| {
            view.switch_view(ViewType::EncounterMap, STATION, "");
            view.switch_deck("deck_2", None, manifest.as_ref())
        })
        .await
        .unwrap();
    let view = store.view().await;
    assert_eq!(view.encounter_deck_id, "deck_2");
    assert_eq!(view.encounter_level, 2);

    let err = store
        .update_view(|view| view.switch_deck("deck_7", None, manifest.as_ref()))
        .await
        .unwrap_err();
    assert_eq!(err, ViewError::UnknownDeck("deck_7".into()));

    let deck = loader.encounter_deck(STATION, "deck_1").unwrap();
    store
        .update_view(|view| view.set_door_status("ops-cargo", DoorStatus::Sealed, deck.as_ref()))
        .await
        .unwrap();
    assert_eq!(
        store.view().await.encounter_door_status["ops-cargo"],
        DoorStatus::Sealed
    );
}

#[tokio::test]
async fn test_out_of_bounds_placement_rejected() {
    let (_dir, loader) = campaign();
    let store = Store::in_memory();
    let deck = loader.encounter_deck(STATION, "").unwrap();

    let err = store
        .update_view(|view| view.place_token(token("drone", TokenKind::Object, 10, 0), deck.as_ref()))
        .await
        .unwrap_err();
    assert!(matches!(err, ViewError::OutOfBounds { .. }));
    assert!(store.view().await.encounter_tokens.is_empty());
}

#[tokio::test]
async fn test_stream_listener_sees_player_projection() {
    let (_dir, loader) = campaign();
    let store = Store::in_memory();
    let deck = loader.encounter_deck(STATION, "").unwrap();
    let mut stream = store.subscribe();

    store
        .update_view(|view| {
            view.place_token(token("alien", TokenKind::Creature, 7, 2), deck.as_ref())?;
            view.set_room_visibility("cargo", false, deck.as_ref())
        })
        .await
        .unwrap();

    let pushed = stream.recv().await.unwrap();
    assert_eq!(pushed.revision, 1);
    assert!(pushed.encounter_tokens.is_empty());
}

#[tokio::test]
async fn test_tokens_stay_on_their_deck() {
    let (_dir, loader) = campaign();
    let store = Store::in_memory();
    let manifest = loader.encounter_manifest(STATION).unwrap();
    let deck = loader.encounter_deck(STATION, "").unwrap();

    store
        .update_view(|view| {
            view.switch_view(ViewType::EncounterMap, STATION, "");
            view.place_token(token("alien", TokenKind::Creature, 7, 2), deck.as_ref())
        })
        .await
        .unwrap();
    let polled = store.player_view().await;
    assert_eq!(polled.encounter_tokens["alien"].deck_id.as_deref(), Some("deck_1"));

    store
        .update_view(|view| view.switch_deck("deck_2", None, manifest.as_ref()))
        .await
        .unwrap();
    assert!(store.player_view().await.encounter_tokens.is_empty());
    assert!(store.view().await.encounter_tokens.contains_key("alien"));

    let hangar = loader.encounter_deck(STATION, "deck_2").unwrap();
    store
        .update_view(|view| view.move_token("alien", 1, 1, hangar.as_ref()))
        .await
        .unwrap();
    let polled = store.player_view().await;
    assert_eq!(polled.encounter_tokens["alien"].deck_id.as_deref(), Some("deck_2"));
}
