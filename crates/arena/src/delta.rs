//! Per-tick outputs of the simulation: world deltas, leaderboards, viewports
//! and stats.

use crate::color::Color;
use crate::entity::{CellData, CellType};
use crate::spatial::Bounds;
use glam::Vec2;

/// Snapshot of one body as seen by observers.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyView {
    pub id: u32,
    pub kind: CellType,
    pub position: Vec2,
    pub size: f32,
    pub color: Color,
    pub owner: Option<u32>,
}

impl From<&CellData> for BodyView {
    fn from(data: &CellData) -> Self {
        Self {
            id: data.node_id,
            kind: data.cell_type,
            position: data.position,
            size: data.size(),
            color: data.color,
            owner: data.owner_id,
        }
    }
}

/// A body that left the world this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedBody {
    pub id: u32,
    /// The body that ate it, if it was eaten.
    pub eaten_by: Option<u32>,
}

/// Everything that changed in the world during one tick.
#[derive(Debug, Clone, Default)]
pub struct WorldDelta {
    pub tick: u64,
    pub added: Vec<BodyView>,
    pub updated: Vec<BodyView>,
    pub removed: Vec<RemovedBody>,
}

impl WorldDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// A leaderboard entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// Player or team ID.
    pub id: u32,
    pub name: String,
    /// Total mass, or a team's share of the total mass.
    pub score: f32,
}

/// Leaderboard update broadcast.
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    pub tick: u64,
    /// Sorted list of entries (highest score first).
    pub entries: Vec<LeaderboardEntry>,
    pub gamemode_id: u32,
    pub gamemode_name: String,
}

/// What one player can see.
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Mean position of the player's cells.
    pub center: Vec2,
    pub scale: f32,
    pub bounds: Bounds,
    pub visible: Vec<BodyView>,
}

/// Population counts and timing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameStats {
    pub tick: u64,
    pub players: usize,
    pub player_cells: usize,
    pub food: usize,
    pub viruses: usize,
    pub ejected: usize,
    pub moving: usize,
    /// Exponential moving average of the step duration.
    pub update_time_avg_ms: f64,
}
