//! Native Arena - headless simulation server.

use arena::{Broadcasts, Config, Game};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,arena=debug")))
        .init();

    info!("Native Arena v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("Loaded configuration");
    info!("  Tick: {}ms", config.server.tick_interval_ms);
    info!("  Border: {}x{}", config.border.width, config.border.height);
    info!("  Game mode: {}", config.server.gamemode);

    let mut game = Game::new(config);
    game.populate();

    let out = Broadcasts::new(16);
    let mut leaderboards = out.leaderboards.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the game loop
    let game_loop = tokio::spawn(arena::run(game, out, shutdown_rx));

    // Log the leaderboard as it refreshes
    let lb_task = tokio::spawn(async move {
        loop {
            match leaderboards.recv().await {
                Ok(lb) => {
                    if let Some(top) = lb.entries.first() {
                        debug!("Leaderboard @{}: {} leads with {:.0}", lb.tick, top.name, top.score);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => warn!("Leaderboard observer skipped {} updates", n),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    shutdown_tx.send(true)?;

    let game = game_loop.await?;
    lb_task.abort();

    let stats = game.stats();
    info!(
        "Final tick {}: {} players, {} food, {} viruses (avg step {:.2}ms)",
        stats.tick, stats.players, stats.food, stats.viruses, stats.update_time_avg_ms
    );
    Ok(())
}
