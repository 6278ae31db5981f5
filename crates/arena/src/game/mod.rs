//! Game state and the fixed-timestep step.
//!
//! [`Game`] is the single writer of the simulation. Each call to
//! [`Game::step`] drains queued commands, moves boosted bodies, moves player
//! cells, auto-splits, spawns and finally hands control to the gamemode.

mod collide;
mod movement;
mod spawn;
mod split;

use crate::color::Color;
use crate::config::Config;
use crate::delta::{BodyView, GameStats, Leaderboard, Viewport, WorldDelta};
use crate::gamemodes::{GameMode, get_gamemode};
use crate::inbox::{Action, CommandSender, Inbox};
use crate::player::Player;
use crate::spatial::Bounds;
use crate::world::World;
use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Ticks between leaderboard refreshes.
pub const LEADERBOARD_INTERVAL: u64 = 25;

/// Ticks between mass decay rounds.
pub const DECAY_INTERVAL: u64 = 25;

/// What one step produced.
#[derive(Debug)]
pub struct StepOutput {
    pub delta: WorldDelta,
    /// Present on leaderboard refresh ticks.
    pub leaderboard: Option<Leaderboard>,
    pub elapsed: Duration,
}

/// Main game state.
pub struct Game {
    pub config: Config,
    pub world: World,
    pub players: HashMap<u32, Player>,
    pub tick_count: u64,
    pub gamemode: Box<dyn GameMode>,
    pub(crate) rng: StdRng,

    inbox: Inbox,
    leaderboard: Leaderboard,
    next_player_id: u32,

    /// Average step duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

impl Game {
    /// Create a new game. The config is expected to be validated.
    pub fn new(config: Config) -> Self {
        let rng = match config.server.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let world = World::new(config.border.width, config.border.height);
        let gamemode = get_gamemode(config.server.gamemode);
        info!(
            "Game created: {} mode, border {}x{}",
            gamemode.name(),
            config.border.width,
            config.border.height
        );

        Self {
            world,
            players: HashMap::new(),
            tick_count: 0,
            gamemode,
            rng,
            inbox: Inbox::new(),
            leaderboard: Leaderboard::default(),
            next_player_id: 1,
            update_time_avg: 0.0,
            config,
        }
    }

    /// Handle for queueing player commands from other tasks.
    pub fn command_sender(&self) -> CommandSender {
        self.inbox.sender()
    }

    /// Fill the world with its minimum food and virus populations.
    pub fn populate(&mut self) {
        while self.world.food_cells().len() < self.config.food.min_amount {
            if self.spawn_food() == 0 {
                break;
            }
        }
        while self.world.virus_cells().len() < self.config.virus.min_amount {
            if self.spawn_viruses() == 0 {
                break;
            }
        }

        let counts = self.world.cell_counts();
        info!("World initialized: {} food, {} viruses", counts.food, counts.viruses);
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) -> StepOutput {
        let tick_start = Instant::now();

        self.apply_commands();
        self.expire_disconnected();

        // Boosted bodies collide strictly before player cells.
        self.update_moving_cells();
        self.update_player_cells();
        self.auto_split_cells();

        if self.tick_count % self.config.server.spawn_interval == 0 {
            self.spawn_cells();
        }

        // Game mode tick logic
        // We need to temporarily take ownership to satisfy borrow checker
        let mut gamemode = std::mem::replace(&mut self.gamemode, Box::new(crate::gamemodes::ffa::Ffa::new()));
        gamemode.on_tick(self);
        self.gamemode = gamemode;

        self.tick_count += 1;

        let leaderboard = if (self.tick_count + 7) % LEADERBOARD_INTERVAL == 0 {
            self.update_leaderboard();
            Some(self.leaderboard.clone())
        } else {
            None
        };

        let delta = self.world.take_delta(self.tick_count);
        let elapsed = tick_start.elapsed();
        let tick_ms = elapsed.as_secs_f64() * 1000.0;
        self.update_time_avg += 0.5 * (tick_ms - self.update_time_avg);

        // Log performance metrics every 400 ticks
        if self.tick_count % 400 == 0 {
            let counts = self.world.cell_counts();
            let (nodes, depth) = self.world.index_shape();
            debug!(
                "Tick #{}: {:.2}ms (avg {:.2}ms) | {} cells, {} players | quad-tree {} nodes, depth {}",
                self.tick_count,
                tick_ms,
                self.update_time_avg,
                counts.total,
                self.players.len(),
                nodes,
                depth
            );
        }

        StepOutput {
            delta,
            leaderboard,
            elapsed,
        }
    }

    /// Current tick.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick_count
    }

    #[inline]
    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.get(&id)
    }

    #[inline]
    pub fn player_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Most recent leaderboard.
    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Population counts and timing.
    pub fn stats(&self) -> GameStats {
        let counts = self.world.cell_counts();
        GameStats {
            tick: self.tick_count,
            players: self.players.len(),
            player_cells: counts.players,
            food: counts.food,
            viruses: counts.viruses,
            ejected: counts.ejected,
            moving: counts.moving,
            update_time_avg_ms: self.update_time_avg,
        }
    }

    /// What `player_id` can see: the view box scales with the total size of
    /// the player's cells.
    pub fn viewport(&self, player_id: u32) -> Option<Viewport> {
        let player = self.players.get(&player_id)?;
        let cells: Vec<_> = player
            .cells
            .iter()
            .filter_map(|&id| self.world.get_cell(id))
            .map(|cell| cell.data())
            .collect();
        if cells.is_empty() {
            return None;
        }

        let total_size: f32 = cells.iter().map(|c| c.size()).sum();
        let center = cells.iter().map(|c| c.position).sum::<Vec2>() / cells.len() as f32;
        let scale = (64.0 / total_size).min(1.0).powf(0.4).max(self.config.server.min_scale);

        let half_w = self.config.server.view_base_x / scale / 2.0;
        let half_h = self.config.server.view_base_y / scale / 2.0;
        let bounds = Bounds::new(center.x - half_w, center.y - half_h, center.x + half_w, center.y + half_h);

        let mut visible: Vec<BodyView> = self
            .world
            .query(&bounds)
            .into_iter()
            .filter_map(|id| self.world.get_cell(id))
            .map(|cell| BodyView::from(cell.data()))
            .collect();
        visible.sort_by_key(|body| body.id);

        Some(Viewport {
            center,
            scale,
            bounds,
            visible,
        })
    }

    /// Register a new player. The player has no cells until spawned.
    pub fn add_player(&mut self, name: impl Into<String>) -> u32 {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let mut player = Player::new(id, name.into(), Color::random(&mut self.rng));
        self.gamemode.on_player_join(&mut player, &mut self.rng);
        info!("Player {} joined as {:?}", id, player.display_name());
        self.players.insert(id, player);
        id
    }

    /// Set where a player's cells steer.
    pub fn set_target(&mut self, player_id: u32, target: Vec2) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.target = target;
        }
    }

    /// Mark a player as gone. Their cells stay until `disconnect_time` runs out.
    pub fn disconnect(&mut self, player_id: u32) {
        if let Some(player) = self.players.get_mut(&player_id) {
            if player.disconnected_at.is_none() {
                player.disconnected_at = Some(self.tick_count);
                info!("Player {} disconnected with {} cells", player_id, player.cells.len());
            }
        }
    }

    fn apply_commands(&mut self) {
        let drained = self.inbox.drain();
        for (player_id, target) in drained.targets {
            self.set_target(player_id, target);
        }
        for command in drained.actions {
            match command {
                Action::Split { player_id } => self.handle_split(player_id),
                Action::Eject { player_id } => self.handle_eject(player_id),
                Action::Respawn { player_id } => {
                    if self.players.get(&player_id).is_some_and(|p| !p.is_alive() && p.is_connected()) {
                        self.spawn_player(player_id);
                    }
                }
                Action::Join { name, reply } => {
                    let player_id = self.add_player(name);
                    self.spawn_player(player_id);
                    if reply.send(player_id).is_err() {
                        debug!("Join reply for player {} dropped", player_id);
                    }
                }
                Action::Disconnect { player_id } => self.disconnect(player_id),
            }
        }
    }

    /// Drop disconnected players whose cells are gone or have outlived the
    /// configured disconnect time.
    fn expire_disconnected(&mut self) {
        let ticks_allowed = self.config.player.disconnect_time.checked_mul(25).and_then(|t| u64::try_from(t).ok());
        let tick = self.tick_count;

        let mut expired: Vec<u32> = self
            .players
            .values()
            .filter(|p| match p.disconnected_at {
                Some(_) if p.cells.is_empty() => true,
                Some(at) => ticks_allowed.is_some_and(|allowed| tick.saturating_sub(at) >= allowed),
                None => false,
            })
            .map(|p| p.id)
            .collect();
        expired.sort_unstable();

        for player_id in expired {
            if let Some(player) = self.players.remove(&player_id) {
                for cell_id in player.cells {
                    self.world.remove_cell(cell_id, None);
                }
                info!("Removed disconnected player {}", player_id);
            }
        }
    }

    fn update_leaderboard(&mut self) {
        let mut entries = self.gamemode.get_leaderboard(&self.world, &self.players);
        entries.truncate(self.config.server.leaderboard_size);
        self.leaderboard = Leaderboard {
            tick: self.tick_count,
            entries,
            gamemode_id: self.gamemode.id(),
            gamemode_name: self.gamemode.name().to_string(),
        };
    }

    /// Check that the spatial index matches the world.
    pub fn is_consistent(&self) -> bool {
        self.world.index_is_consistent()
            && self.players.values().all(|p| {
                p.cells.len() <= p.max_cells(self.config.player.max_cells.max(self.config.virus.max_cells))
                    && p.cells.iter().all(|&id| {
                        self.world
                            .player_cell(id)
                            .is_some_and(|c| c.cell_data.owner_id == Some(p.id))
                    })
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inbox::Command;

    /// A quiet world: no food or virus spawning, fixed seed.
    pub(crate) fn quiet_config() -> Config {
        let mut config = Config::default();
        config.server.seed = Some(11);
        config.border.width = 10_000.0;
        config.border.height = 10_000.0;
        config.food.min_amount = 0;
        config.food.max_amount = 0;
        config.virus.min_amount = 0;
        config.virus.max_amount = 100;
        config
    }

    #[test]
    fn test_populate_reaches_minimums() {
        let mut config = quiet_config();
        config.food.min_amount = 100;
        config.food.max_amount = 200;
        config.virus.min_amount = 5;
        let mut game = Game::new(config);
        game.populate();

        assert_eq!(game.world.food_cells().len(), 100);
        assert_eq!(game.world.virus_cells().len(), 5);
        assert!(game.is_consistent());
    }

    #[test]
    fn test_join_through_inbox_spawns() {
        let mut game = Game::new(quiet_config());
        let sender = game.command_sender();
        let (reply, mut rx) = tokio::sync::oneshot::channel();
        sender
            .send(Command::Join {
                name: "alice".into(),
                reply,
            })
            .unwrap();

        game.step();
        let player_id = rx.try_recv().unwrap();
        let player = game.player(player_id).unwrap();
        assert_eq!(player.cells.len(), 1);
        assert_eq!(player.target, game.world.get_cell(player.cells[0]).unwrap().data().position);
        assert!(game.is_consistent());
    }

    #[test]
    fn test_viewport_scale() {
        let mut game = Game::new(quiet_config());
        let id = game.add_player("viewer");
        game.spawn_player(id);

        let view = game.viewport(id).unwrap();
        let expected = (64.0f32 / 31.623).min(1.0).powf(0.4);
        assert!((view.scale - expected).abs() < 1e-5);
        assert!(view.visible.iter().any(|b| b.owner == Some(id)));
        assert!(game.viewport(999).is_none());
    }

    #[test]
    fn test_leaderboard_refresh_phase() {
        let mut game = Game::new(quiet_config());
        let id = game.add_player("top");
        game.spawn_player(id);

        let mut refreshed = Vec::new();
        for _ in 0..50 {
            if game.step().leaderboard.is_some() {
                refreshed.push(game.tick());
            }
        }
        assert_eq!(refreshed, vec![18, 43]);
        assert_eq!(game.leaderboard().entries[0].id, id);
    }

    #[test]
    fn test_disconnect_expiry() {
        let mut config = quiet_config();
        config.player.disconnect_time = 1;
        let mut game = Game::new(config);
        let id = game.add_player("leaver");
        game.spawn_player(id);
        game.disconnect(id);

        // Checked at the start of each step, before the tick advances.
        for _ in 0..25 {
            game.step();
        }
        assert!(game.player(id).is_some());

        game.step();
        assert!(game.player(id).is_none());
        assert!(game.world.player_cells().is_empty());
        assert!(game.is_consistent());
    }

    #[test]
    fn test_disconnect_forever_keeps_cells() {
        let mut game = Game::new(quiet_config());
        let id = game.add_player("idle");
        game.spawn_player(id);
        game.disconnect(id);
        for _ in 0..100 {
            game.step();
        }
        assert_eq!(game.player(id).unwrap().cells.len(), 1);
    }
}
