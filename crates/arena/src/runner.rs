//! Fixed-cadence driver for [`Game::step`].
//!
//! The runner owns the game for its whole life and is the only task that
//! mutates it. Deltas and leaderboards go out on broadcast channels, so a
//! slow observer lags or drops messages instead of stalling the tick.

use crate::delta::{Leaderboard, WorldDelta};
use crate::game::Game;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Gap after which the clock gives up on catching up.
pub const RESYNC_THRESHOLD: Duration = Duration::from_millis(120);

/// What the clock says to do at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// Not due yet.
    Wait(Duration),
    /// Run one step. `resynced` is set when missed time was dropped.
    Run { resynced: bool },
}

/// Fixed timestep accumulator with resynchronisation.
#[derive(Debug, Clone)]
pub struct TickClock {
    interval: Duration,
    baseline: Instant,
}

impl TickClock {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self { interval, baseline: now }
    }

    /// Advance the baseline by one interval once it is due. A backlog larger
    /// than [`RESYNC_THRESHOLD`] is dropped and the baseline moves to `now`.
    pub fn poll(&mut self, now: Instant) -> ClockTick {
        let dt = now.saturating_duration_since(self.baseline);
        if dt < self.interval {
            return ClockTick::Wait(self.interval - dt);
        }
        if dt > RESYNC_THRESHOLD {
            self.baseline = now;
            return ClockTick::Run { resynced: true };
        }
        self.baseline += self.interval;
        ClockTick::Run { resynced: false }
    }
}

/// Outbound channels fed once per tick.
#[derive(Debug, Clone)]
pub struct Broadcasts {
    pub deltas: broadcast::Sender<Arc<WorldDelta>>,
    pub leaderboards: broadcast::Sender<Arc<Leaderboard>>,
}

impl Broadcasts {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (deltas, _) = broadcast::channel(capacity);
        let (leaderboards, _) = broadcast::channel(capacity);
        Self { deltas, leaderboards }
    }
}

/// Drive the game until `shutdown` flips to `true`, then hand it back.
pub async fn run(mut game: Game, out: Broadcasts, mut shutdown: watch::Receiver<bool>) -> Game {
    let interval = Duration::from_millis(game.config.server.tick_interval_ms);
    let budget = interval.mul_f64(0.9);
    let mut clock = TickClock::new(interval, Instant::now());
    info!("Simulation running at {:?} per tick", interval);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match clock.poll(Instant::now()) {
            ClockTick::Wait(wait) => {
                tokio::select! {
                    _ = sleep_until(Instant::now() + wait) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break; // sender gone
                        }
                    }
                }
                continue;
            }
            ClockTick::Run { resynced } => {
                if resynced {
                    debug!("Tick clock resynchronised at tick {}", game.tick());
                }
            }
        }

        let output = game.step();
        if output.elapsed > budget {
            let counts = game.world.cell_counts();
            warn!(
                "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} cells total",
                game.tick(),
                output.elapsed.as_secs_f64() * 1000.0,
                budget.as_secs_f64() * 1000.0,
                game.players.len(),
                counts.total
            );
        }

        // No receivers is not an error.
        if !output.delta.is_empty() {
            let _ = out.deltas.send(Arc::new(output.delta));
        }
        if let Some(leaderboard) = output.leaderboard {
            let _ = out.leaderboards.send(Arc::new(leaderboard));
        }
    }

    info!("Simulation stopped at tick {}", game.tick());
    game
}
