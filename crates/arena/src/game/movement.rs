//! Movement passes: boosted bodies, then player cells.

use super::{DECAY_INTERVAL, Game};
use crate::entity::{Cell, CellType};
use crate::world::CellEntry;

/// Remaining distance under which a cell does not steer.
const MIN_MOVE_DISTANCE: f32 = 1.0;

impl Game {
    /// Advance every boosted ownerless body and resolve what it touches.
    pub(super) fn update_moving_cells(&mut self) {
        let border = self.world.border;

        for cell_id in self.world.moving_cells().snapshot() {
            let moved = match self.world.get_cell_mut(cell_id) {
                Some(cell) if cell.data().cell_type != CellType::Food => cell.data_mut().update_boost(&border),
                _ => continue,
            };
            if moved {
                self.world.refresh(cell_id);
            }

            self.resolve_moving_collisions(cell_id);

            if self.world.get_cell(cell_id).is_none_or(|cell| !cell.data().is_moving) {
                self.world.remove_from_moving(cell_id);
            }
        }
    }

    /// Remerge, steer, collide, boost and decay every player cell.
    pub(super) fn update_player_cells(&mut self) {
        let tick = self.tick_count;
        let decay_tick = (tick + 3) % DECAY_INTERVAL == 0;

        for cell_id in self.world.player_cells().snapshot() {
            if self.world.get_cell(cell_id).is_none() {
                continue;
            }

            self.move_player_cell(cell_id);
            self.resolve_player_collisions(cell_id);

            let border = self.world.border;
            let boosted = match self.world.get_cell_mut(cell_id) {
                Some(cell) => cell.data_mut().update_boost(&border),
                None => continue, // eaten during the scan
            };
            if boosted {
                self.world.refresh(cell_id);
            }

            if decay_tick {
                self.decay_cell(cell_id);
            }
        }
    }

    /// Update remerge eligibility and step toward the owner's target.
    fn move_player_cell(&mut self, cell_id: u32) {
        let Some(owner_id) = self.world.get_cell(cell_id).and_then(|c| c.data().owner_id) else {
            return;
        };
        let Some(player) = self.players.get(&owner_id) else {
            return;
        };
        let instant = player.instant_merge();
        let can_move = !player.frozen && player.is_connected();
        let target = player.target;

        let tick = self.tick_count;
        let recombine_time = self.config.player.recombine_time;
        let speed = self.config.player.speed;
        let border = self.world.border;

        let Some(CellEntry::Player(cell)) = self.world.get_cell_mut(cell_id) else {
            return;
        };
        cell.update_merge(tick, recombine_time, instant);
        if !can_move {
            return;
        }

        let d = target - cell.cell_data.position;
        let dist = d.length();
        if dist < MIN_MOVE_DISTANCE {
            return; // avoid jittering
        }
        let step = cell.get_speed(dist, speed);
        cell.cell_data.position += d / dist * step;
        cell.cell_data.check_border(&border);
        self.world.refresh(cell_id);
    }

    /// Shrink a player cell by the configured decay rate.
    pub(super) fn decay_cell(&mut self, cell_id: u32) {
        let min_size = self.config.player.min_size;
        let cap = self.config.player.decay_cap;
        let mut rate = self.config.player.decay_rate;
        let modifier = self.gamemode.decay_modifier();

        let Some(cell) = self.world.get_cell_mut(cell_id) else {
            return;
        };
        let data = cell.data_mut();
        let size = data.size();
        if rate <= 0.0 || size <= min_size {
            return;
        }

        if cap > 0.0 && data.mass() > cap {
            rate *= 10.0;
        }
        let decay = 1.0 - rate * modifier;
        let new_size = (data.size_sq() * decay).sqrt().max(min_size);
        data.set_size(new_size);
        self.world.refresh(cell_id);
    }
}
