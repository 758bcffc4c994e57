//! CHARON queries against the sample campaign with a scripted model.
//!
//! The live test at the bottom requires ANTHROPIC_API_KEY.
//! Run with: `cargo test -p mothership-core --test charon_flow -- --ignored`

use mothership_core::campaign::CampaignLoader;
use mothership_core::charon::{Charon, CharonError, KnowledgeLoader, Speaker};
use mothership_core::testing::{self, ScriptedResponder, STATION_PATH};
use mothership_core::ClaudeResponder;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _data: TempDir,
    _vault: TempDir,
    charon: Charon,
    responder: Arc<ScriptedResponder>,
}

fn fixture(answers: &[&str]) -> Fixture {
    let data = TempDir::new().expect("Failed to create temp directory");
    let vault = TempDir::new().expect("Failed to create temp directory");
    testing::write_sample_campaign(data.path()).expect("Failed to write campaign");
    testing::write_sample_vault(vault.path()).expect("Failed to write vault");

    let responder = Arc::new(ScriptedResponder::new(answers.iter().copied()));
    let charon = Charon::new(
        CampaignLoader::new(data.path()),
        Some(vault.path().to_path_buf()),
        Some(responder.clone()),
    );
    Fixture {
        _data: data,
        _vault: vault,
        charon,
        responder,
    }
}

#[test]
fn test_station_knowledge() {
    let data = TempDir::new().unwrap();
    let vault = TempDir::new().unwrap();
    testing::write_sample_campaign(data.path()).unwrap();
    testing::write_sample_vault(vault.path()).unwrap();

    let loader = KnowledgeLoader::new(
        CampaignLoader::new(data.path()),
        Some(vault.path().to_path_buf()),
    );
    let knowledge = loader.load(STATION_PATH).unwrap();

    assert_eq!(knowledge.location_chain.len(), 2);
    assert_eq!(knowledge.location_chain[1].path, STATION_PATH);
    assert_eq!(
        knowledge.instance.as_ref().unwrap().instance_id.as_deref(),
        Some("CHARON-VEIL-7")
    );
    assert!(knowledge.lore.starts_with("## Overview"));
    assert!(knowledge.lore.contains("Built by the company to refine Kepler-B ice."));
    assert!(knowledge.lore.contains("Commissioned in 2161."));
    assert!(!knowledge.lore.contains("reactor is failing"));

    let context = knowledge.context_string();
    assert!(context.contains("Clearance Level: RESTRICTED"));
    assert!(context.contains("- STATION: Veil Station"));
}

#[test]
fn test_missing_lore_note_is_reported() {
    let data = TempDir::new().unwrap();
    let empty_vault = TempDir::new().unwrap();
    testing::write_sample_campaign(data.path()).unwrap();

    let loader = KnowledgeLoader::new(
        CampaignLoader::new(data.path()),
        Some(empty_vault.path().to_path_buf()),
    );
    let knowledge = loader.load(STATION_PATH).unwrap();
    assert_eq!(
        knowledge.lore,
        "[LORE FILE NOT FOUND: Locations/Veil Station.md]"
    );
}

#[test]
fn test_no_vault_means_no_lore() {
    let data = TempDir::new().unwrap();
    testing::write_sample_campaign(data.path()).unwrap();

    let loader = KnowledgeLoader::new(CampaignLoader::new(data.path()), None);
    assert!(loader.load(STATION_PATH).unwrap().lore.is_empty());
}

#[tokio::test]
async fn test_query_waits_for_approval() {
    let f = fixture(&["DOCKING BAY 3: SEALED BY COMMAND ORDER."]);

    let outcome = f.charon.query("Why is bay 3 sealed?", STATION_PATH).await.unwrap();
    assert_eq!(outcome.pending.response, "DOCKING BAY 3: SEALED BY COMMAND ORDER.");

    // Players only see their own question until the GM approves.
    let conversation = f.charon.conversation().await;
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].role, Speaker::User);

    let approved = f.charon.approve(&outcome.pending.pending_id, None).await.unwrap();
    assert_eq!(approved.role, Speaker::Charon);
    assert_eq!(f.charon.conversation().await.len(), 2);
    assert!(f.charon.pending().await.is_empty());
}

#[tokio::test]
async fn test_prompt_carries_config_and_databanks() {
    let f = fixture(&["ACKNOWLEDGED."]);
    f.charon.query("Status report.", STATION_PATH).await.unwrap();

    let prompts = f.responder.prompts();
    let prompt = &prompts[0];
    assert!(prompt.system.starts_with("You are CHARON, the station AI of Veil Station."));
    assert!(prompt.system.contains("YOUR DATABANKS CONTAIN:"));
    assert!(prompt.system.contains("Instance ID: CHARON-VEIL-7"));
    assert_eq!(prompt.max_tokens, 300);
    assert_eq!(prompt.messages.len(), 1);
    assert_eq!(prompt.messages[0].content, "Status report.");
}

#[tokio::test]
async fn test_history_sent_with_followup() {
    let f = fixture(&["FIRST.", "SECOND."]);
    let first = f.charon.query("One?", STATION_PATH).await.unwrap();
    f.charon.approve(&first.pending.pending_id, None).await.unwrap();
    f.charon.query("Two?", STATION_PATH).await.unwrap();

    let prompts = f.responder.prompts();
    let followup = &prompts[1];
    let contents: Vec<_> = followup.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["One?", "FIRST.", "Two?"]);
}

#[tokio::test]
async fn test_reject_edit_send_and_clear() {
    let f = fixture(&["THE REACTOR IS FAILING."]);
    let outcome = f.charon.query("Is the reactor safe?", STATION_PATH).await.unwrap();

    f.charon.reject(&outcome.pending.pending_id).await.unwrap();
    assert_eq!(
        f.charon.reject(&outcome.pending.pending_id).await,
        Err(CharonError::UnknownPending(outcome.pending.pending_id.clone()))
    );

    let sent = f.charon.send("ALL SYSTEMS NOMINAL.").await.unwrap();
    assert_eq!(sent.role, Speaker::Charon);
    assert_eq!(f.charon.send("  ").await, Err(CharonError::EmptyMessage));

    let again = f.charon.query("Really?", STATION_PATH).await.unwrap();
    let edited = f
        .charon
        .approve(&again.pending.pending_id, Some("AFFIRMATIVE.".into()))
        .await
        .unwrap();
    assert_eq!(edited.content, "AFFIRMATIVE.");

    f.charon.clear().await;
    assert!(f.charon.conversation().await.is_empty());
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let f = fixture(&[]);
    assert_eq!(
        f.charon.query("   ", STATION_PATH).await.unwrap_err(),
        CharonError::EmptyQuery
    );
}

#[tokio::test]
async fn test_fallback_without_model() {
    let data = TempDir::new().unwrap();
    testing::write_sample_campaign(data.path()).unwrap();
    let charon = Charon::new(CampaignLoader::new(data.path()), None, None);

    let outcome = charon.query("Hello?", "").await.unwrap();
    assert_eq!(
        outcome.pending.response,
        "[SIGNAL DEGRADED] QUERY CANNOT BE PROCESSED."
    );

    let info = charon.info("").await;
    assert_eq!(info.designation, "Station Operations Intelligence");
    assert!(!info.ai_available);
}

#[tokio::test]
async fn test_reload_rereads_config() {
    let f = fixture(&[]);
    assert_eq!(f.charon.info(STATION_PATH).await.version, "7.2.1");

    let config = f._data.path().join("charon/context.yaml");
    std::fs::write(&config, "name: CHARON\nversion: 8.0.0\n").unwrap();
    assert_eq!(f.charon.info(STATION_PATH).await.version, "7.2.1");

    assert_eq!(f.charon.reload().await, 1);
    assert_eq!(f.charon.info(STATION_PATH).await.version, "8.0.0");
}

// =============================================================================
// Live API
// =============================================================================

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

#[tokio::test]
#[ignore]
async fn test_live_charon_answers_in_character() {
    setup();
    let Ok(responder) = ClaudeResponder::from_env(None) else {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    };

    let data = TempDir::new().unwrap();
    testing::write_sample_campaign(data.path()).unwrap();
    let charon = Charon::new(CampaignLoader::new(data.path()), None, Some(Arc::new(responder)));

    let outcome = charon
        .query("Identify yourself and this station.", STATION_PATH)
        .await
        .unwrap();
    println!("CHARON: {}", outcome.pending.response);
    assert!(!outcome.pending.response.is_empty());
    assert_ne!(
        outcome.pending.response,
        "[SIGNAL DEGRADED] QUERY CANNOT BE PROCESSED."
    );
}
