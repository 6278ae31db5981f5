//! Splitting, ejecting and virus pops.

use super::Game;
use crate::entity::{Cell, EjectedMass, MASS_DIVISOR, PlayerCell, Virus};
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;
use tracing::debug;

/// Angular jitter applied to ejected mass, in radians.
const EJECT_JITTER: f32 = 0.3;

/// Piece masses for a cell of `cell_mass` popped into at most `cells_left`
/// new cells, none lighter than `split_min` unless the mass cannot fill the
/// slots.
pub(crate) fn virus_pop_masses(cell_mass: f32, cells_left: usize, split_min: f32) -> Vec<f32> {
    let mut splits = Vec::new();
    if cells_left == 0 {
        return splits;
    }

    // Not enough mass for every slot: explode into a power of two.
    if cell_mass / (cells_left as f32) < split_min {
        let mut split_count = 2usize;
        let mut split_mass = cell_mass / split_count as f32;
        while split_mass > split_min && 2 * split_count < cells_left {
            split_count *= 2;
            split_mass = cell_mass / split_count as f32;
        }
        // The popped cell keeps one share.
        split_mass = cell_mass / (split_count + 1) as f32;
        splits.resize(split_count, split_mass);
        return splits;
    }

    let mut mass_left = cell_mass / 2.0;
    let mut split_mass = cell_mass / 2.0;
    let mut remaining = cells_left;

    while remaining > 0 {
        remaining -= 1;

        // With no slot left the division is infinite and never fills.
        if mass_left / (remaining as f32) < split_min {
            split_mass = mass_left / remaining as f32;
            while remaining > 0 {
                remaining -= 1;
                splits.push(split_mass);
            }
        }

        while split_mass >= mass_left && remaining > 0 {
            split_mass /= 2.0;
        }
        splits.push(split_mass);
        mass_left -= split_mass;
    }
    splits
}

impl Game {
    /// Split `mass` off a player cell into a new boosted sibling.
    ///
    /// Returns the new cell ID, or `None` when the split would leave either
    /// half under the minimum size. Callers gate on `min_split_size`; virus
    /// pops do not.
    pub(super) fn split_player_cell(&mut self, owner_id: u32, parent_id: u32, angle: f32, mass: f32) -> Option<u32> {
        let min_size = self.config.player.min_size;
        let tick = self.tick_count;

        let parent = self.world.player_cell(parent_id)?;
        let parent_size = parent.cell_data.size();

        let size = (mass * MASS_DIVISOR).sqrt();
        let remainder = (parent_size * parent_size - size * size).sqrt();
        if !size.is_finite() || !remainder.is_finite() || size < min_size || remainder < min_size {
            return None;
        }
        let position = parent.cell_data.position;
        let color = parent.cell_data.color;

        if let Some(parent) = self.world.get_cell_mut(parent_id).and_then(|c| c.as_player_mut()) {
            parent.cell_data.set_size(remainder);
            parent.reset_recombine(tick);
        }
        self.world.refresh(parent_id);

        let id = self.world.next_id();
        let mut child = PlayerCell::new(id, owner_id, position, size, tick).with_color(color);
        child.data_mut().set_boost(self.config.player.split_velocity, angle);
        self.world.add_player_cell(child);
        if let Some(owner) = self.players.get_mut(&owner_id) {
            owner.cells.push(id);
        }
        Some(id)
    }

    /// Split every eligible cell of a player toward its target.
    pub fn handle_split(&mut self, player_id: u32) {
        let Some(player) = self.players.get(&player_id) else {
            return;
        };
        let max_cells = player.max_cells(self.config.player.max_cells);
        let target = player.target;
        let min_split_size = self.config.player.min_split_size;

        // Oldest cells split first.
        let to_split: Vec<u32> = player
            .cells
            .iter()
            .copied()
            .filter(|&id| self.world.get_cell(id).is_some_and(|c| c.data().size() >= min_split_size))
            .collect();

        for cell_id in to_split {
            if self.players.get(&player_id).is_none_or(|p| p.cells.len() >= max_cells) {
                break;
            }
            let Some(cell) = self.world.get_cell(cell_id) else {
                continue;
            };
            let d = target - cell.data().position;
            let angle = if d.length() < 1.0 { 0.0 } else { d.x.atan2(d.y) };
            let mass = cell.data().mass() * 0.5;
            self.split_player_cell(player_id, cell_id, angle, mass);
        }
    }

    /// Eject a blob of mass from every cell big enough toward the target.
    pub fn handle_eject(&mut self, player_id: u32) {
        let tick = self.tick_count;
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        if !player.can_eject(tick, self.config.eject.cooldown) {
            return;
        }
        // The cooldown starts even if no cell is big enough.
        player.last_eject_tick = Some(tick);
        let target = player.target;
        let cells = player.cells.clone();

        let eject = self.config.eject.clone();
        let min_eject_size = self.config.player.min_eject_size;
        let min_size = self.config.player.min_size;
        let mut ejected = 0;

        for cell_id in cells {
            let Some(cell) = self.world.get_cell_mut(cell_id) else {
                continue;
            };
            let data = cell.data_mut();
            if data.size() < min_eject_size {
                continue;
            }

            let d = target - data.position;
            let dist = d.length();
            let dir = if dist > 1.0 { d / dist } else { Vec2::X };

            let remainder_sq = data.size_sq() - eject.size_loss * eject.size_loss;
            if remainder_sq <= 0.0 {
                continue;
            }
            let remainder = remainder_sq.sqrt();
            if remainder < min_size {
                continue;
            }
            data.set_size(remainder);
            let position = data.position + dir * remainder;
            let color = data.color;
            self.world.refresh(cell_id);

            let angle = dir.x.atan2(dir.y) + self.rng.random_range(-EJECT_JITTER..EJECT_JITTER);
            let id = self.world.next_id();
            let mut blob = EjectedMass::new(id, position, eject.size, tick).with_color(color);
            blob.data_mut().set_boost(eject.velocity, angle);
            self.world.add_eject(blob);
            ejected += 1;
        }

        if ejected > 0 {
            debug!("Player {} ejected {} blobs", player_id, ejected);
        }
    }

    /// Split oversized cells, or clamp them when no slot is free.
    pub(super) fn auto_split_cells(&mut self) {
        let mobile = self.config.server.mobile_physics;
        let max_cells = self.config.player.max_cells;

        for cell_id in self.world.player_cells().snapshot() {
            let Some(cell) = self.world.player_cell(cell_id) else {
                continue;
            };
            let Some(owner_id) = cell.cell_data.owner_id else {
                continue;
            };
            let size = cell.cell_data.size();
            let mass = cell.cell_data.mass();
            let Some(player) = self.players.get(&owner_id) else {
                continue;
            };
            let max_size = player.max_size(self.config.player.max_size);
            if player.merge_override || size < max_size {
                continue;
            }

            if player.cells.len() >= max_cells || mobile {
                if let Some(cell) = self.world.get_cell_mut(cell_id) {
                    cell.data_mut().set_size(max_size);
                }
                self.world.refresh(cell_id);
            } else {
                let angle = self.rng.random::<f32>() * TAU;
                self.split_player_cell(owner_id, cell_id, angle, mass * 0.5);
            }
        }
    }

    /// Break a player cell that ate a virus into pieces.
    pub(super) fn pop_player_cell(&mut self, cell_id: u32) {
        let Some(cell) = self.world.player_cell(cell_id) else {
            return;
        };
        let Some(owner_id) = cell.cell_data.owner_id else {
            return;
        };
        let mass = cell.cell_data.mass();
        let Some(owner) = self.players.get(&owner_id) else {
            return;
        };

        let cells_left = self.config.virus.max_cells.saturating_sub(owner.cells.len());
        let pieces = virus_pop_masses(mass, cells_left, self.config.virus.split_div);
        debug!("Cell {} popped into {} pieces", cell_id, pieces.len());

        for piece in pieces {
            let angle = self.rng.random::<f32>() * TAU;
            self.split_player_cell(owner_id, cell_id, angle, piece);
        }
    }

    /// Fire a new virus out of `parent_id` along `angle`.
    pub(super) fn shoot_virus(&mut self, parent_id: u32, angle: f32) {
        let Some(parent) = self.world.get_cell(parent_id) else {
            return;
        };
        let position = parent.data().position;
        let id = self.world.next_id();
        let mut virus = Virus::new(id, position, self.config.virus.min_size, self.tick_count);
        virus.data_mut().set_boost(self.config.virus.velocity, angle);
        self.world.add_virus(virus);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::quiet_config;
    use super::*;
    use crate::entity::CellType;

    fn game_with_cell(size: f32) -> (Game, u32, u32) {
        let mut game = Game::new(quiet_config());
        let player_id = game.add_player("p");
        let cell_id = game.world.next_id();
        game.world
            .add_player_cell(PlayerCell::new(cell_id, player_id, Vec2::ZERO, size, 0));
        game.player_mut(player_id).unwrap().cells.push(cell_id);
        (game, player_id, cell_id)
    }

    fn size(game: &Game, id: u32) -> f32 {
        game.world.get_cell(id).unwrap().data().size()
    }

    #[test]
    fn test_split_halves_mass() {
        let (mut game, player_id, cell_id) = game_with_cell(60.0);
        let child = game.split_player_cell(player_id, cell_id, 0.0, 18.0).unwrap();

        let expected = 1800.0f32.sqrt();
        assert!((size(&game, cell_id) - expected).abs() < 1e-3);
        assert!((size(&game, child) - expected).abs() < 1e-3);
        let total = size(&game, cell_id).powi(2) + size(&game, child).powi(2);
        assert!((total - 3600.0).abs() < 1e-2);

        let data = game.world.get_cell(child).unwrap().data();
        assert_eq!(data.boost_distance(), 780.0);
        assert_eq!(data.boost.direction, Vec2::new(0.0, 1.0));
        assert_eq!(data.owner_id, Some(player_id));
        assert_eq!(game.player(player_id).unwrap().cells, vec![cell_id, child]);
        assert!(game.is_consistent());
    }

    #[test]
    fn test_split_below_minimum_is_dropped() {
        // Child too small.
        let (mut game, player_id, cell_id) = game_with_cell(100.0);
        assert!(game.split_player_cell(player_id, cell_id, 0.0, 5.0).is_none());
        // Remainder would be imaginary.
        assert!(game.split_player_cell(player_id, cell_id, 0.0, 200.0).is_none());
        assert_eq!(size(&game, cell_id), 100.0);
        assert_eq!(game.world.player_cells().len(), 1);
    }

    #[test]
    fn test_min_split_size_gates_commands_not_pops() {
        let (mut game, player_id, cell_id) = game_with_cell(59.0);
        game.handle_split(player_id);
        assert_eq!(game.player(player_id).unwrap().cells.len(), 1);
        assert_eq!(size(&game, cell_id), 59.0);

        let piece = game.split_player_cell(player_id, cell_id, 0.0, 59.0 * 59.0 / 200.0);
        assert!(piece.is_some());
        assert_eq!(game.player(player_id).unwrap().cells.len(), 2);
    }

    #[test]
    fn test_handle_split_aims_and_respects_limit() {
        let (mut game, player_id, cell_id) = game_with_cell(200.0);
        game.set_target(player_id, Vec2::new(500.0, 0.0));
        game.handle_split(player_id);

        let player = game.player(player_id).unwrap();
        assert_eq!(player.cells.len(), 2);
        let child = game.world.get_cell(player.cells[1]).unwrap().data();
        assert!((child.boost.direction.x - 1.0).abs() < 1e-5);
        assert!(child.boost.direction.y.abs() < 1e-5);

        game.config.player.max_cells = 2;
        game.handle_split(player_id);
        assert_eq!(game.player(player_id).unwrap().cells.len(), 2);
        assert!(game.world.get_cell(cell_id).is_some());
    }

    #[test]
    fn test_auto_split_clamps_at_cell_limit() {
        let (mut game, player_id, cell_id) = game_with_cell(1600.0);
        game.config.player.max_cells = 1;
        game.auto_split_cells();
        assert_eq!(size(&game, cell_id), 1500.0);
        assert_eq!(game.world.player_cells().len(), 1);

        game.config.player.max_cells = 16;
        game.world.get_cell_mut(cell_id).unwrap().data_mut().set_size(1600.0);
        game.auto_split_cells();
        assert_eq!(game.player(player_id).unwrap().cells.len(), 2);
        let half = 1600.0 / 2.0f32.sqrt();
        assert!((size(&game, cell_id) - half).abs() < 1e-1);
    }

    #[test]
    fn test_merge_override_disables_auto_split() {
        let (mut game, player_id, cell_id) = game_with_cell(1600.0);
        game.player_mut(player_id).unwrap().merge_override = true;
        game.auto_split_cells();
        assert_eq!(size(&game, cell_id), 1600.0);
    }

    #[test]
    fn test_eject_geometry_and_cooldown() {
        let (mut game, player_id, cell_id) = game_with_cell(100.0);
        game.set_target(player_id, Vec2::new(0.0, 300.0));
        game.handle_eject(player_id);

        let remainder = (100.0f32 * 100.0 - 45.0 * 45.0).sqrt();
        assert!((size(&game, cell_id) - remainder).abs() < 1e-3);
        assert_eq!(game.world.eject_cells().len(), 1);

        let blob_id = game.world.eject_cells().as_slice()[0];
        let blob = game.world.get_cell(blob_id).unwrap().data();
        assert_eq!(blob.cell_type, CellType::EjectedMass);
        assert_eq!(blob.size(), 40.0);
        assert!((blob.position - Vec2::new(0.0, remainder)).length() < 1e-3);
        assert!(blob.boost.angle().abs() <= EJECT_JITTER + 1e-5);
        assert!(game.world.moving_cells().contains(blob_id));

        // Still cooling down.
        game.handle_eject(player_id);
        assert_eq!(game.world.eject_cells().len(), 1);
        game.tick_count += 3;
        game.handle_eject(player_id);
        assert_eq!(game.world.eject_cells().len(), 2);
    }

    #[test]
    fn test_small_cells_do_not_eject() {
        let (mut game, player_id, cell_id) = game_with_cell(50.0);
        game.handle_eject(player_id);
        assert!(game.world.eject_cells().is_empty());
        assert_eq!(size(&game, cell_id), 50.0);
        assert_eq!(game.player(player_id).unwrap().last_eject_tick, Some(0));
    }

    #[test]
    fn test_pop_masses_power_of_two() {
        // 100 / 15 is under the minimum piece mass.
        let pieces = virus_pop_masses(100.0, 15, 36.0);
        assert_eq!(pieces, vec![20.0; 4]);
    }

    #[test]
    fn test_pop_masses_fill_slots() {
        let pieces = virus_pop_masses(1000.0, 15, 36.0);
        assert_eq!(pieces.len(), 15);
        let total: f32 = pieces.iter().sum();
        assert!(total < 1000.0);

        let pieces = virus_pop_masses(10_000.0, 3, 36.0);
        // The last piece takes whatever the halving left.
        assert_eq!(pieces, vec![2500.0, 1250.0, 1250.0]);
        assert!(virus_pop_masses(10_000.0, 0, 36.0).is_empty());
    }
}
