use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bumper_arena_server::config::ServerConfig;
use bumper_arena_server::game::shared::SharedWorld;
use bumper_arena_server::metrics::{self, Metrics};
use bumper_arena_server::net::game_session::{start_game_loop, GameSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Bumper Arena Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: arena {}x{}, {} wells, {} debris, metrics on {}:{}",
        config.arena_width,
        config.arena_height,
        config.well_count,
        config.debris_count,
        config.bind_address,
        config.metrics_port
    );

    let metrics = Arc::new(Metrics::new());

    let metrics_clone = metrics.clone();
    let (bind_address, metrics_port) = (config.bind_address, config.metrics_port);
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, bind_address, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let world = SharedWorld::from_config(&config.world_config())?;
    let session = Arc::new(GameSession::new(world, metrics, config.outbox_capacity));
    let game_loop = start_game_loop(session.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    game_loop.abort();
    info!(
        "Server stopped after tick {}",
        session.world().read(|w| w.tick)
    );

    Ok(())
}
