//! The HTTP surface, driven in-process against the sample campaign.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mothership_core::testing::{self, ScriptedResponder, STATION, STATION_PATH, STATION_TERMINAL};
use mothership_core::Store;
use mothership_server::{build_router, AppState, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestServer {
    _data: TempDir,
    app: Router,
}

fn server_with(configure: impl FnOnce(ServerConfig) -> ServerConfig, answers: &[&str]) -> TestServer {
    let data = TempDir::new().expect("Failed to create temp directory");
    testing::write_sample_campaign(data.path()).expect("Failed to write campaign");

    let config = configure(ServerConfig::new(data.path()).in_memory());
    let responder = Arc::new(ScriptedResponder::new(answers.iter().copied()));
    let state = AppState::new(config, Store::in_memory(), Some(responder));
    TestServer {
        _data: data,
        app: build_router(state),
    }
}

fn server() -> TestServer {
    server_with(|config| config, &[])
}

impl TestServer {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }

    async fn enter_station_encounter(&self) {
        let (status, _) = self
            .post(
                "/api/gm/view",
                json!({ "view_type": "ENCOUNTER_MAP", "location_slug": STATION }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_health() {
    let s = server();
    let (status, body) = s.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_token_placed_then_hidden_with_room() {
    let s = server();
    s.enter_station_encounter().await;

    let (status, token) = s
        .post(
            "/api/gm/encounter/tokens",
            json!({ "id": "alien", "kind": "CREATURE", "name": "Xenomorph", "x": 7, "y": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(token["room_id"], "cargo");

    let (_, view) = s.get("/api/active-view").await;
    assert_eq!(view["view_type"], "ENCOUNTER_MAP");
    assert_eq!(view["encounter_tokens"]["alien"]["x"], 7);
    assert_eq!(view["encounter_tokens"]["alien"]["status"], json!([]));

    let (status, toggled) = s.post("/api/gm/encounter/rooms/cargo/toggle", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["visible"], false);

    let (_, view) = s.get("/api/active-view").await;
    assert!(view["encounter_tokens"].get("alien").is_none());
    let (_, gm) = s.get("/api/gm/active-view").await;
    assert_eq!(gm["encounter_tokens"]["alien"]["name"], "Xenomorph");
}

#[tokio::test]
async fn test_token_move_status_and_remove() {
    let s = server();
    s.enter_station_encounter().await;
    s.post(
        "/api/gm/encounter/tokens",
        json!({ "id": "ash", "kind": "PLAYER", "x": 1, "y": 1 }),
    )
    .await;

    let (status, moved) = s
        .call(
            Method::PATCH,
            "/api/gm/encounter/tokens/ash",
            Some(json!({ "x": 6, "status": ["WOUNDED"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((moved["x"].clone(), moved["y"].clone()), (json!(6), json!(1)));
    assert_eq!(moved["status"], json!(["WOUNDED"]));

    let (status, _) = s
        .call(Method::PATCH, "/api/gm/encounter/tokens/ash", Some(json!({ "x": 99 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = s.call(Method::DELETE, "/api/gm/encounter/tokens/ash", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = s.call(Method::DELETE, "/api/gm/encounter/tokens/ash", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("ash"));
}

#[tokio::test]
async fn test_empty_token_update_rejected() {
    let s = server();
    s.enter_station_encounter().await;
    s.post(
        "/api/gm/encounter/tokens",
        json!({ "id": "ash", "kind": "PLAYER", "x": 1, "y": 1 }),
    )
    .await;
    let (_, before) = s.get("/api/gm/active-view").await;

    let (status, body) = s
        .call(Method::PATCH, "/api/gm/encounter/tokens/ash", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, after) = s.get("/api/gm/active-view").await;
    assert_eq!(after["revision"], before["revision"]);
}

#[tokio::test]
async fn test_unknown_location_and_room_rejected() {
    let s = server();
    let (status, body) = s
        .post("/api/gm/view", json!({ "view_type": "ENCOUNTER_MAP", "location_slug": "nowhere" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    s.enter_station_encounter().await;
    let (status, _) = s
        .call(
            Method::PUT,
            "/api/gm/encounter/rooms/bridge",
            Some(json!({ "visible": false })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_doors_and_decks() {
    let s = server();
    s.enter_station_encounter().await;

    let (status, door) = s
        .call(
            Method::PUT,
            "/api/gm/encounter/doors/ops-cargo",
            Some(json!({ "status": "LOCKED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(door["status"], "LOCKED");

    let (status, view) = s.post("/api/gm/encounter/deck", json!({ "deck_id": "deck_2" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["encounter_deck_id"], "deck_2");
    assert_eq!(view["encounter_level"], 2);

    let (status, _) = s.post("/api/gm/encounter/deck", json!({ "deck_id": "deck_9" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_portraits() {
    let s = server();
    let (status, _) = s.post("/api/gm/portraits/ripley/toggle", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, shown) = s.post("/api/gm/portraits/chen/toggle", json!({})).await;
    assert_eq!(shown["shown"], true);
    assert_eq!(shown["active_portraits"], json!(["chen"]));

    let (_, hidden) = s.post("/api/gm/portraits/chen/toggle", json!({})).await;
    assert_eq!(hidden["active_portraits"], json!([]));
}

#[tokio::test]
async fn test_broadcast_log() {
    let s = server();
    let (status, first) = s
        .post(
            "/api/gm/messages",
            json!({ "sender": "Station Control", "content": "Docking approved.", "priority": "LOW" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    s.post(
        "/api/gm/messages",
        json!({ "content": "HULL BREACH DETECTED.", "priority": "CRITICAL" }),
    )
    .await;

    let (_, list) = s.get("/api/messages").await;
    assert_eq!(list["count"], 2);
    assert_eq!(list["messages"][0]["content"], "Docking approved.");
    assert_eq!(list["messages"][1]["sender"], "CHARON");
    assert_eq!(list["messages"][1]["priority"], "CRITICAL");

    let (_, since) = s.get(&format!("/api/messages?since={}", first["id"])).await;
    assert_eq!(since["count"], 1);
    let (_, garbage) = s.get("/api/messages?since=abc").await;
    assert_eq!(garbage["count"], 2);

    let (_, recent) = s.get("/api/gm/messages/recent").await;
    assert_eq!(recent["messages"][0]["content"], "HULL BREACH DETECTED.");

    let (status, _) = s.post("/api/gm/messages", json!({ "content": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gm_routes_require_token() {
    let s = server_with(|config| config.with_gm_token("bishop"), &[]);

    let (status, _) = s.get("/api/gm/active-view").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/gm/active-view")
        .header(header::AUTHORIZATION, "Bearer bishop")
        .body(Body::empty())
        .unwrap();
    let (status, _) = s.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = s.get("/api/active-view").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_ship_overrides() {
    let s = server();
    let (status, _) = s
        .call(
            Method::PUT,
            "/api/gm/ship/systems/jump_drive",
            Some(json!({ "status": "ONLINE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, ship) = s.get("/api/ship").await;
    assert_eq!(ship["name"], "Tempest");
    assert_eq!(ship["systems"]["jump_drive"]["status"], "ONLINE");
    assert_eq!(ship["systems"]["jump_drive"]["overridden"], true);

    s.call(Method::DELETE, "/api/gm/ship/systems/jump_drive", None).await;
    let (_, ship) = s.get("/api/ship").await;
    assert_eq!(ship["systems"]["jump_drive"]["status"], "OFFLINE");
}

#[tokio::test]
async fn test_campaign_content() {
    let s = server();
    let (status, locations) = s.get("/api/locations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(locations[0]["slug"], "anchor-system");

    let (_, map) = s.get(&format!("/api/locations/{STATION}/map")).await;
    assert_eq!(map["is_multi_deck"], true);
    let (_, deck) = s.get(&format!("/api/locations/{STATION}/decks/deck_2")).await;
    assert_eq!(deck["deck_id"], "deck_2");

    let terminal = format!("/api/locations/{STATION}/terminals/{STATION_TERMINAL}");
    let (_, found) = s.get(&terminal).await;
    assert_eq!(found["owner"], "Commander Drake");
    let (_, thread) = s.get(&format!("{terminal}/conversations/reactor-leak")).await;
    assert_eq!(thread.as_array().unwrap().len(), 2);
    let (_, message) = s.get(&format!("{terminal}/messages/msg-002")).await;
    assert_eq!(message["in_reply_to"], "msg-001");
    let (status, _) = s.get(&format!("{terminal}/messages/msg-404")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, system) = s.get("/api/galaxy/systems/anchor-system").await;
    assert_eq!(system["star"]["class"], "K2");
    let (_, npc) = s.get("/api/npcs/chen").await;
    assert_eq!(npc["name"], "Dr. Mei Chen");
    let (_, sessions) = s.get("/api/sessions").await;
    assert_eq!(sessions.as_array().unwrap().len(), 2);

    let (status, _) = s.get("/api/locations/..").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_campaign_files_served() {
    let s = server();
    let response = s
        .app
        .clone()
        .oneshot(Request::builder().uri("/data/npcs/chen.png").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stream_is_event_stream() {
    let s = server();
    let response = s
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/active-view/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}

#[tokio::test]
async fn test_charon_approval_flow() {
    let s = server_with(|config| config, &["BAY 3 IS SEALED."]);

    let (status, query) = s
        .post(
            "/api/charon/query",
            json!({ "query": "Why is bay 3 sealed?", "location_path": STATION_PATH }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(query["role"], "user");

    let (_, pending) = s.get("/api/gm/charon/pending").await;
    assert_eq!(pending[0]["response"], "BAY 3 IS SEALED.");
    let id = pending[0]["pending_id"].as_str().unwrap().to_string();

    let (status, approved) = s
        .post(
            &format!("/api/gm/charon/pending/{id}/approve"),
            json!({ "content": "BAY 3: ACCESS RESTRICTED." }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["content"], "BAY 3: ACCESS RESTRICTED.");

    let (_, conversation) = s.get("/api/charon/conversation").await;
    assert_eq!(conversation.as_array().unwrap().len(), 2);

    let (status, _) = s.post(&format!("/api/gm/charon/pending/{id}/reject"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = s.call(Method::DELETE, "/api/gm/charon/conversation", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, conversation) = s.get("/api/charon/conversation").await;
    assert_eq!(conversation, json!([]));
}

#[tokio::test]
async fn test_charon_config_and_empty_query() {
    let s = server();
    let (_, config) = s.get("/api/charon/config").await;
    assert_eq!(config["designation"], "Station Operations Intelligence");
    assert_eq!(config["ai_available"], true);

    let (status, _) = s.post("/api/charon/query", json!({ "query": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, reloaded) = s.post("/api/gm/charon/reload", json!({})).await;
    assert_eq!(reloaded["reloaded"], 1);
}
