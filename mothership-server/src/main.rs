//! Mothership GM terminal server.
//!
//! ```bash
//! cargo run -p mothership-server
//! cargo run -p mothership-server -- check
//! ```

use anyhow::Context;
use mothership_core::CampaignLoader;
use mothership_server::{AppState, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = ServerConfig::from_env()?;

    if args.iter().skip(1).any(|a| a == "check") {
        return check(&config);
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    let state = AppState::from_config(config).await;

    mothership_server::serve(listener, state, shutdown_signal()).await?;
    info!("terminal offline");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Load every part of the campaign once and report what was found.
fn check(config: &ServerConfig) -> anyhow::Result<()> {
    let loader = CampaignLoader::new(&config.data_dir);

    let systems = loader.load_all_locations().context("loading locations")?;
    let locations: usize = systems.iter().map(|s| s.count()).sum();
    let npcs = loader.load_npcs().context("loading NPCs")?;
    let crew = loader.load_crew().context("loading crew")?;
    let sessions = loader.load_session_logs().context("loading session logs")?;
    let ship = loader.load_ship_status().context("loading ship")?;
    loader.load_star_map().context("loading star map")?;

    info!(
        data_dir = %config.data_dir.display(),
        systems = systems.len(),
        locations,
        npcs = npcs.len(),
        crew = crew.len(),
        sessions = sessions.len(),
        ship = ship.as_ref().map(|s| s.name.as_str()).unwrap_or("none"),
        "campaign ok"
    );
    Ok(())
}

fn print_help() {
    println!("Mothership GM terminal server");
    println!();
    println!("USAGE:");
    println!("  mothership-server [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("  (none)       Serve the terminal");
    println!("  check        Load the campaign data and report problems");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help   Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("  MOTHERSHIP_BIND         Listen address (default: 127.0.0.1:8000)");
    println!("  MOTHERSHIP_DATA_DIR     Campaign data (default: data)");
    println!("  MOTHERSHIP_STATE_FILE   Saved active view (default: state/active_view.json)");
    println!("  MOTHERSHIP_GM_TOKEN     Bearer token for GM routes (default: open)");
    println!("  OBSIDIAN_VAULT_PATH     Lore vault for CHARON");
    println!("  ANTHROPIC_API_KEY       Enables CHARON's model; fallbacks without it");
    println!("  CHARON_MODEL            Model override for CHARON");
    println!("  RUST_LOG                Log filter (default: info,tower_http=info)");
}
