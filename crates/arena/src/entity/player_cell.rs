//! Player cell.

use super::cell::{Cell, CellData, CellType, EatContext};
use crate::color::Color;
use glam::Vec2;

/// Boost distance under which an instant-merge cell may remerge.
const INSTANT_MERGE_BOOST: f32 = 100.0;

/// A cell controlled by a player.
#[derive(Debug, Clone)]
pub struct PlayerCell {
    /// Cell data (public for direct access).
    pub cell_data: CellData,
    /// Whether this cell can remerge with siblings.
    pub can_remerge: bool,
    /// Tick the recombine timer started (birth, or the last split).
    pub recombine_tick: u64,
}

impl PlayerCell {
    /// Create a new player cell.
    pub fn new(node_id: u32, owner_id: u32, position: Vec2, size: f32, tick: u64) -> Self {
        let mut data = CellData::new(node_id, CellType::Player, position, size, tick);
        data.owner_id = Some(owner_id);
        Self {
            cell_data: data,
            can_remerge: false,
            recombine_tick: tick,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.cell_data.color = color;
        self
    }

    /// Restart the recombine timer, as happens to both halves of a split.
    #[inline]
    pub fn reset_recombine(&mut self, tick: u64) {
        self.recombine_tick = tick;
        self.can_remerge = false;
    }

    /// Update merge status based on current tick and recombine time (seconds).
    ///
    /// With `instant` set, or no recombine time configured, a cell may merge
    /// as soon as it is nearly done boosting. Otherwise it waits
    /// `max(recombine_time, size * 0.2) * 25` ticks. Returns the new status.
    pub fn update_merge(&mut self, current_tick: u64, recombine_time: f32, instant: bool) -> bool {
        if instant || recombine_time <= 0.0 {
            self.can_remerge = self.cell_data.boost_distance() < INSTANT_MERGE_BOOST;
            return self.can_remerge;
        }

        let age = current_tick.saturating_sub(self.recombine_tick);
        let time = (recombine_time.max(self.cell_data.size() * 0.2) * 25.0) as u64;
        self.can_remerge = age >= time;
        self.can_remerge
    }
}

impl Cell for PlayerCell {
    fn data(&self) -> &CellData {
        &self.cell_data
    }

    fn data_mut(&mut self) -> &mut CellData {
        &mut self.cell_data
    }

    /// Team and ownership restrictions are applied by the collision rules.
    fn can_eat(&self, _prey: &CellData, _ctx: &EatContext) -> bool {
        true
    }

    /// JS: 2.2 * Math.pow(size, -0.439) * 40 * playerSpeed, capped by the
    /// remaining distance.
    fn get_speed(&self, distance: f32, speed_mult: f32) -> f32 {
        let base_speed = 2.2 * self.cell_data.size().powf(-0.439) * 40.0 * speed_mult;
        base_speed.min(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_waits_for_recombine_time() {
        let mut cell = PlayerCell::new(1, 7, Vec2::ZERO, 60.0, 0);
        // max(30, 12) * 25 = 750 ticks.
        assert!(!cell.update_merge(749, 30.0, false));
        assert!(cell.update_merge(750, 30.0, false));

        cell.reset_recombine(750);
        assert!(!cell.can_remerge);
        assert!(!cell.update_merge(1000, 30.0, false));
    }

    #[test]
    fn test_large_cells_wait_longer() {
        let mut cell = PlayerCell::new(1, 7, Vec2::ZERO, 500.0, 0);
        // max(30, 100) * 25 = 2500 ticks.
        assert!(!cell.update_merge(2000, 30.0, false));
        assert!(cell.update_merge(2500, 30.0, false));
    }

    #[test]
    fn test_instant_merge_needs_boost_done() {
        let mut cell = PlayerCell::new(1, 7, Vec2::ZERO, 60.0, 0);
        cell.cell_data.set_boost(780.0, 0.0);
        assert!(!cell.update_merge(1, 30.0, true));
        cell.cell_data.boost.distance = 50.0;
        assert!(cell.update_merge(1, 30.0, true));
    }

    #[test]
    fn test_speed_capped_by_distance() {
        let cell = PlayerCell::new(1, 7, Vec2::ZERO, 31.623, 0);
        let full = 2.2 * 31.623f32.powf(-0.439) * 40.0;
        assert!((cell.get_speed(1000.0, 1.0) - full).abs() < 1e-3);
        assert_eq!(cell.get_speed(2.0, 1.0), 2.0);
    }
}
