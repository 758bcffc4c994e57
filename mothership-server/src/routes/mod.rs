//! HTTP routes. Everything under `/api/gm` sits behind the GM token.

mod campaign;
mod charon;
mod encounter;
mod messages;
mod view;

use crate::auth::require_gm;
use crate::state::{AppState, SharedState};
use axum::http::{header, Method};
use axum::routing::{delete, get, patch, post, put};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let state: SharedState = Arc::new(state);
    let data = ServeDir::new(&state.config.data_dir);

    Router::new()
        .route("/health", get(health))
        .merge(player_routes())
        .merge(gm_routes(state.clone()))
        .nest_service("/data", data)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors())
}

async fn health() -> &'static str {
    "ok"
}

fn player_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/active-view", get(view::active_view))
        .route("/api/active-view/stream", get(view::active_view_stream))
        .route("/api/messages", get(messages::list))
        .route("/api/messages/senders", get(messages::senders))
        .route("/api/locations", get(campaign::locations))
        .route("/api/locations/{slug}", get(campaign::location))
        .route("/api/locations/{slug}/map", get(campaign::location_map))
        .route("/api/locations/{slug}/decks/{deck}", get(campaign::location_deck))
        .route(
            "/api/locations/{slug}/terminals/{terminal}",
            get(campaign::terminal),
        )
        .route(
            "/api/locations/{slug}/terminals/{terminal}/conversations",
            get(campaign::terminal_conversations),
        )
        .route(
            "/api/locations/{slug}/terminals/{terminal}/conversations/{conversation}",
            get(campaign::terminal_conversation),
        )
        .route(
            "/api/locations/{slug}/terminals/{terminal}/messages/{message}",
            get(campaign::terminal_message),
        )
        .route("/api/galaxy/star-map", get(campaign::star_map))
        .route("/api/galaxy/systems/{system}", get(campaign::system_map))
        .route("/api/galaxy/systems/{system}/{body}", get(campaign::orbit_map))
        .route("/api/npcs", get(campaign::npcs))
        .route("/api/npcs/{id}", get(campaign::npc))
        .route("/api/ship", get(campaign::ship))
        .route("/api/crew", get(campaign::crew))
        .route("/api/sessions", get(campaign::sessions))
        .route("/api/sessions/{slug}", get(campaign::session))
        .route("/api/charon/config", get(charon::config))
        .route("/api/charon/conversation", get(charon::conversation))
        .route("/api/charon/query", post(charon::query))
}

fn gm_routes(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/gm/active-view", get(view::gm_active_view))
        .route("/api/gm/view", post(view::switch_view))
        .route(
            "/api/gm/overlay",
            post(view::show_overlay).delete(view::hide_overlay),
        )
        .route("/api/gm/charon/state", post(view::set_charon_state))
        .route(
            "/api/gm/ship/systems/{name}",
            put(view::set_ship_system).delete(view::clear_ship_system),
        )
        .route("/api/gm/portraits", delete(view::clear_portraits))
        .route("/api/gm/portraits/{id}/toggle", post(view::toggle_portrait))
        .route("/api/gm/encounter/tokens", post(encounter::place_token))
        .route(
            "/api/gm/encounter/tokens/{id}",
            patch(encounter::update_token).delete(encounter::remove_token),
        )
        .route("/api/gm/encounter/rooms/{id}", put(encounter::set_room))
        .route("/api/gm/encounter/rooms/{id}/toggle", post(encounter::toggle_room))
        .route("/api/gm/encounter/doors/{id}", put(encounter::set_door))
        .route("/api/gm/encounter/deck", post(encounter::switch_deck))
        .route("/api/gm/messages", post(messages::broadcast))
        .route("/api/gm/messages/recent", get(messages::recent))
        .route("/api/gm/charon/pending", get(charon::pending))
        .route("/api/gm/charon/pending/{id}/approve", post(charon::approve))
        .route("/api/gm/charon/pending/{id}/reject", post(charon::reject))
        .route("/api/gm/charon/send", post(charon::send))
        .route("/api/gm/charon/conversation", delete(charon::clear))
        .route("/api/gm/charon/reload", post(charon::reload))
        .route_layer(middleware::from_fn_with_state(state, require_gm))
}

/// Player screens and the GM console may be served from another origin
/// on the local network.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any)
}
