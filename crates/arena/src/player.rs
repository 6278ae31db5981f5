//! Player state.

use crate::color::Color;
use glam::Vec2;

/// A participant controlling a cluster of player cells.
#[derive(Debug, Clone)]
pub struct Player {
    /// Unique player ID.
    pub id: u32,
    /// Player name.
    pub name: String,
    /// Player color.
    pub color: Color,
    /// Cell IDs owned by this player, oldest first.
    pub cells: Vec<u32>,
    /// World point the cells steer toward.
    pub target: Vec2,
    /// Tick of the last successful eject (for cooldown).
    pub last_eject_tick: Option<u64>,
    /// Disables auto-split and allows instant merging.
    pub merge_override: bool,
    /// Raises the cell and size limits and enables instant merging.
    pub rec: bool,
    /// Frozen players neither move nor eject.
    pub frozen: bool,
    /// Player team (0=Red, 1=Green, 2=Blue).
    pub team: Option<u8>,
    /// Tick at which the player disconnected, if they did.
    pub disconnected_at: Option<u64>,
}

impl Player {
    /// Create a new player.
    pub fn new(id: u32, name: String, color: Color) -> Self {
        Self {
            id,
            name,
            color,
            cells: Vec::with_capacity(16),
            target: Vec2::ZERO,
            last_eject_tick: None,
            merge_override: false,
            rec: false,
            frozen: false,
            team: None,
            disconnected_at: None,
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.disconnected_at.is_none()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.cells.is_empty()
    }

    /// Name shown on leaderboards.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "An unnamed cell"
        } else {
            &self.name
        }
    }

    /// Whether this player's cells merge as soon as their boost runs out.
    #[inline]
    pub fn instant_merge(&self) -> bool {
        self.rec || self.merge_override
    }

    /// Cell limit for manual splits.
    #[inline]
    pub fn max_cells(&self, configured: usize) -> usize {
        if self.rec { 200 } else { configured }
    }

    /// Size above which a cell auto-splits.
    #[inline]
    pub fn max_size(&self, configured: f32) -> f32 {
        if self.rec { 1e9 } else { configured }
    }

    /// Whether an eject is allowed at `tick` given the cooldown in ticks.
    pub fn can_eject(&self, tick: u64, cooldown: u64) -> bool {
        !self.frozen
            && self
                .last_eject_tick
                .is_none_or(|last| tick.saturating_sub(last) >= cooldown)
    }

    pub(crate) fn remove_cell(&mut self, cell_id: u32) {
        if let Some(pos) = self.cells.iter().position(|&id| id == cell_id) {
            self.cells.remove(pos);
        }
    }
}
