//! Food, virus and player spawning.

use super::Game;
use crate::color::Color;
use crate::entity::{CellType, Food, MIN_BOOST_DISTANCE, PlayerCell, Virus};
use crate::spatial::Bounds;
use glam::Vec2;
use rand::Rng;
use tracing::{debug, info};

/// Viruses spawned per round at most.
const VIRUS_SPAWN_AMOUNT: usize = 2;

/// Attempts at finding a free spot before giving up.
const SAFE_SPAWN_ATTEMPTS: usize = 10;

/// Spawning on ejected mass makes the new cell at least this much larger.
const EJECT_SPAWN_GROWTH: f32 = 1.15;

impl Game {
    /// Top food and viruses up toward their minimum populations.
    pub(super) fn spawn_cells(&mut self) {
        let food = self.spawn_food();
        let viruses = self.spawn_viruses();
        if food + viruses > 0 {
            debug!("Spawned {} food and {} viruses", food, viruses);
        }
    }

    /// One round of food spawning. Returns how many pellets were added.
    pub(super) fn spawn_food(&mut self) -> usize {
        let cfg = &self.config.food;
        let count = self.world.food_cells().len();
        let spawn = cfg
            .min_amount
            .saturating_sub(count)
            .min(cfg.max_amount.saturating_sub(count))
            .min(cfg.spawn_amount);

        let (min_size, max_size, grow) = (cfg.min_size, cfg.max_size, cfg.mass_grow);
        for _ in 0..spawn {
            let position = self.world.border.random_position(&mut self.rng);
            let mut size = min_size;
            if grow {
                size += (max_size - min_size) * self.rng.random::<f32>();
            }
            let color = Color::random(&mut self.rng);
            let id = self.world.next_id();
            self.world
                .add_food(Food::new(id, position, size, self.tick_count).with_color(color));
        }
        spawn
    }

    /// One round of virus spawning on free spots. Returns how many viruses
    /// were added.
    pub(super) fn spawn_viruses(&mut self) -> usize {
        let cfg = &self.config.virus;
        let count = self.world.virus_cells().len();
        let wanted = cfg
            .min_amount
            .saturating_sub(count)
            .min(cfg.max_amount.saturating_sub(count))
            .min(VIRUS_SPAWN_AMOUNT);
        let size = cfg.min_size;

        let mut spawned = 0;
        for _ in 0..wanted {
            let Some(position) = self.find_free_position(size) else {
                debug!("No free spot for a virus this round");
                continue;
            };
            let id = self.world.next_id();
            self.world.add_virus(Virus::new(id, position, size, self.tick_count));
            spawned += 1;
        }
        spawned
    }

    /// Random position where a body of `size` touches nothing but food.
    fn find_free_position(&mut self, size: f32) -> Option<Vec2> {
        for _ in 0..SAFE_SPAWN_ATTEMPTS {
            let pos = self.world.border.random_position(&mut self.rng);
            if !self.will_collide(pos, size) {
                return Some(pos);
            }
        }
        None
    }

    /// Whether a body of `size` at `pos` would overlap a non-food body.
    pub fn will_collide(&self, pos: Vec2, size: f32) -> bool {
        self.overlaps_solid(pos, size, None)
    }

    fn overlaps_solid(&self, pos: Vec2, size: f32, ignore: Option<u32>) -> bool {
        let bound = Bounds::from_center(pos.x, pos.y, size);
        let mut hit = false;
        self.world.find(&bound, |id, _| {
            if hit || ignore == Some(id) {
                return;
            }
            if let Some(cell) = self.world.get_cell(id) {
                let data = cell.data();
                hit = data.cell_type != CellType::Food && data.position.distance(pos) < data.size() + size;
            }
        });
        hit
    }

    /// Give a player a fresh cell.
    pub fn spawn_player(&mut self, player_id: u32) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        let mut size = self.config.player.start_size;
        let mut position = self.gamemode.on_spawn(player, &self.world, &mut self.rng);
        let mut spawned_on = None;

        // Try spawning on a resting blob of ejected mass.
        let ejects = self.world.eject_cells();
        if position.is_none() && !ejects.is_empty() {
            let pick = ejects.as_slice()[self.rng.random_range(0..ejects.len())];
            if let Some(eject) = self.world.get_cell(pick) {
                let data = eject.data();
                if data.boost_distance() < MIN_BOOST_DISTANCE
                    && self.rng.random::<f32>() <= self.config.eject.spawn_percent
                {
                    position = Some(data.position);
                    spawned_on = Some(pick);
                    player.color = data.color;
                    size = size.max(data.size() * EJECT_SPAWN_GROWTH);
                }
            }
        }

        let mut position = position.unwrap_or_else(|| self.world.border.random_position(&mut self.rng));
        for _ in 0..SAFE_SPAWN_ATTEMPTS {
            // The chosen blob gets eaten by the new cell.
            if !self.overlaps_solid(position, size, spawned_on) {
                break;
            }
            position = self.world.border.random_position(&mut self.rng);
        }

        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        let id = self.world.next_id();
        let cell = PlayerCell::new(id, player_id, position, size, self.tick_count).with_color(player.color);
        self.world.add_player_cell(cell);
        player.cells.push(id);
        player.target = position;

        info!(
            "Spawned player cell {} for {} at ({:.0}, {:.0})",
            id,
            player.display_name(),
            position.x,
            position.y
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::quiet_config;
    use super::*;
    use crate::entity::{Cell, EjectedMass};

    #[test]
    fn test_food_round_is_bounded() {
        let mut config = quiet_config();
        config.food.min_amount = 100;
        config.food.max_amount = 200;
        let mut game = Game::new(config);

        assert_eq!(game.spawn_food(), 30);
        assert_eq!(game.world.food_cells().len(), 30);
        for &id in game.world.food_cells().as_slice() {
            let size = game.world.get_cell(id).unwrap().data().size();
            assert!((10.0..=20.0).contains(&size));
        }
    }

    #[test]
    fn test_food_never_exceeds_maximum() {
        let mut config = quiet_config();
        config.food.min_amount = 50;
        config.food.max_amount = 10;
        config.food.mass_grow = false;
        let mut game = Game::new(config);

        assert_eq!(game.spawn_food(), 10);
        assert_eq!(game.spawn_food(), 0);
        let id = game.world.food_cells().as_slice()[0];
        assert_eq!(game.world.get_cell(id).unwrap().data().size(), 10.0);
    }

    #[test]
    fn test_virus_round_is_capped() {
        let mut config = quiet_config();
        config.virus.min_amount = 10;
        let mut game = Game::new(config);

        assert_eq!(game.spawn_viruses(), 2);
        assert_eq!(game.world.virus_cells().len(), 2);
    }

    #[test]
    fn test_viruses_avoid_occupied_spots() {
        let mut config = quiet_config();
        config.border.width = 400.0;
        config.border.height = 400.0;
        config.virus.min_amount = 10;
        let mut game = Game::new(config);
        let id = game.world.next_id();
        game.world
            .add_player_cell(PlayerCell::new(id, 1, Vec2::ZERO, 1000.0, 0));

        // Every spot in the world overlaps the giant cell.
        assert_eq!(game.spawn_viruses(), 0);
        assert!(game.world.virus_cells().is_empty());
    }

    #[test]
    fn test_will_collide_ignores_food() {
        let mut game = Game::new(quiet_config());
        let id = game.world.next_id();
        game.world.add_food(Food::new(id, Vec2::ZERO, 20.0, 0));
        assert!(!game.will_collide(Vec2::ZERO, 100.0));

        let id = game.world.next_id();
        game.world.add_virus(Virus::new(id, Vec2::new(150.0, 0.0), 100.0, 0));
        assert!(game.will_collide(Vec2::ZERO, 100.0));
        assert!(!game.will_collide(Vec2::new(-300.0, 0.0), 100.0));
    }

    #[test]
    fn test_spawn_on_resting_eject() {
        let mut config = quiet_config();
        config.eject.spawn_percent = 1.0;
        let mut game = Game::new(config);
        let eject_id = game.world.next_id();
        let color = Color::new(1, 2, 3);
        game.world
            .add_eject(EjectedMass::new(eject_id, Vec2::new(500.0, 500.0), 40.0, 0).with_color(color));

        let player_id = game.add_player("p");
        game.spawn_player(player_id);

        let player = game.player(player_id).unwrap();
        assert_eq!(player.color, color);
        let cell = game.world.get_cell(player.cells[0]).unwrap().data();
        assert_eq!(cell.position, Vec2::new(500.0, 500.0));
        assert!((cell.size() - 46.0).abs() < 1e-4);
        assert_eq!(cell.color, color);
        assert_eq!(player.target, cell.position);
    }

    #[test]
    fn test_spawn_ignores_moving_eject() {
        let mut config = quiet_config();
        config.eject.spawn_percent = 1.0;
        let mut game = Game::new(config);
        let eject_id = game.world.next_id();
        let mut eject = EjectedMass::new(eject_id, Vec2::new(500.0, 500.0), 40.0, 0);
        eject.data_mut().set_boost(100.0, 0.0);
        game.world.add_eject(eject);

        let player_id = game.add_player("p");
        game.spawn_player(player_id);
        let player = game.player(player_id).unwrap();
        let cell = game.world.get_cell(player.cells[0]).unwrap().data();
        assert_eq!(cell.size(), game.config.player.start_size);
        assert!(game.is_consistent());
    }
}
