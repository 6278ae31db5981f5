//! Base cell type and common functionality.

use crate::color::Color;
use crate::spatial::{Bounds, QuadHandle};
use crate::world::WorldBorder;
use glam::Vec2;

/// Mass = size² / 100.
pub const MASS_DIVISOR: f32 = 100.0;

/// Boost fraction consumed per tick.
pub const BOOST_DECAY_DIV: f32 = 9.0;

/// Boost distance under which a body stops moving.
pub const MIN_BOOST_DISTANCE: f32 = 1.0;

/// Cell type enum, also the wire value reported in world deltas.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    #[default]
    Player = 0,
    Food = 1,
    Virus = 2,
    EjectedMass = 3,
}

/// Boost movement data.
///
/// The direction outlives the boost itself: a virus that eats resting
/// ejected mass still shoots along the direction the mass last travelled.
#[derive(Debug, Clone, Copy)]
pub struct BoostData {
    /// Remaining distance to travel.
    pub distance: f32,
    /// Direction vector (normalized).
    pub direction: Vec2,
}

impl Default for BoostData {
    fn default() -> Self {
        Self {
            distance: 0.0,
            direction: Vec2::new(0.0, 1.0),
        }
    }
}

impl BoostData {
    /// Angle of the direction, measured from +y toward +x.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.direction.x.atan2(self.direction.y)
    }
}

/// Direction for an angle measured from +y toward +x.
#[inline]
pub fn angle_direction(angle: f32) -> Vec2 {
    Vec2::new(angle.sin(), angle.cos())
}

/// Keep `value` half a size inside `[min, max]`, pinning to the middle when
/// the cell is wider than the span.
#[inline]
fn clamp_axis(value: f32, min: f32, max: f32, half_size: f32) -> f32 {
    let (lo, hi) = (min + half_size, max - half_size);
    if lo > hi { (min + max) / 2.0 } else { value.max(lo).min(hi) }
}

/// Common cell data shared by all cell types.
#[derive(Debug, Clone)]
pub struct CellData {
    /// Unique node ID.
    pub node_id: u32,
    /// Owning player (None for food, viruses, ejected mass).
    pub owner_id: Option<u32>,
    /// Cell type.
    pub cell_type: CellType,
    /// Position in world coordinates.
    pub position: Vec2,
    /// Radius-like size; mass is always derived from it.
    size: f32,
    /// Cell color.
    pub color: Color,
    /// Tick when the cell was born.
    pub tick_of_birth: u64,
    /// Whether the cell has been removed from the world.
    pub is_removed: bool,
    /// Whether the cell is currently boosting.
    pub is_moving: bool,
    /// Boost movement data.
    pub boost: BoostData,
    /// Handle of the cell's item in the world quad-tree.
    pub(crate) quad: Option<QuadHandle>,
}

impl CellData {
    /// Create new cell data.
    pub fn new(node_id: u32, cell_type: CellType, position: Vec2, size: f32, tick: u64) -> Self {
        Self {
            node_id,
            owner_id: None,
            cell_type,
            position,
            size,
            color: Color::default(),
            tick_of_birth: tick,
            is_removed: false,
            is_moving: false,
            boost: BoostData::default(),
            quad: None,
        }
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Squared size, the conserved quantity of eat and split math.
    #[inline]
    pub fn size_sq(&self) -> f32 {
        self.size * self.size
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.size_sq() / MASS_DIVISOR
    }

    #[inline]
    pub fn set_size(&mut self, size: f32) {
        self.size = size;
    }

    /// Bounding box used by the spatial index.
    #[inline]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_center(self.position.x, self.position.y, self.size)
    }

    /// Get the cell's age in ticks.
    #[inline]
    pub fn get_age(&self, current_tick: u64) -> u64 {
        current_tick.saturating_sub(self.tick_of_birth)
    }

    /// Absorb another body's squared size.
    #[inline]
    pub fn grow(&mut self, other_size_sq: f32) {
        self.set_size((self.size_sq() + other_size_sq).sqrt());
    }

    /// Handle of the cell's quad-tree item, if indexed.
    #[inline]
    pub fn quad_handle(&self) -> Option<QuadHandle> {
        self.quad
    }

    /// Start a boost along `angle`.
    #[inline]
    pub fn set_boost(&mut self, distance: f32, angle: f32) {
        self.boost = BoostData {
            distance,
            direction: angle_direction(angle),
        };
        self.is_moving = true;
    }

    /// Remaining boost distance (zero when not moving).
    #[inline]
    pub fn boost_distance(&self) -> f32 {
        if self.is_moving { self.boost.distance } else { 0.0 }
    }

    /// Clamp position so the cell center stays half a size inside the border.
    #[inline]
    pub fn check_border(&mut self, border: &WorldBorder) {
        let half_size = self.size / 2.0;
        self.position.x = clamp_axis(self.position.x, border.min_x, border.max_x, half_size);
        self.position.y = clamp_axis(self.position.y, border.min_y, border.max_y, half_size);
    }

    /// Advance one tick of boost movement.
    ///
    /// Moves a ninth of the remaining distance and clears the moving flag
    /// once what is left drops under [`MIN_BOOST_DISTANCE`]. Returns true if
    /// the cell moved.
    pub fn update_boost(&mut self, border: &WorldBorder) -> bool {
        if !self.is_moving {
            return false;
        }
        if self.boost.distance < MIN_BOOST_DISTANCE {
            self.stop_boost();
            return false;
        }

        let step = self.boost.distance / BOOST_DECAY_DIV;
        self.boost.distance -= step;
        self.position += self.boost.direction * step;
        self.check_border(border);

        if self.boost.distance < MIN_BOOST_DISTANCE {
            self.stop_boost();
        }
        true
    }

    #[inline]
    fn stop_boost(&mut self) {
        self.boost.distance = 0.0;
        self.is_moving = false;
    }
}

/// Population limits and virus sizes consulted by eat permissions.
#[derive(Debug, Clone, Copy)]
pub struct EatContext {
    pub virus_count: usize,
    pub virus_max_amount: usize,
    pub virus_min_size: f32,
    pub virus_max_size: f32,
}

/// Follow-up work a cell asks the game to perform after an eat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reaction {
    None,
    /// Split the player cell that swallowed a virus.
    Pop { cell_id: u32 },
    /// Fire a new virus out of `virus_id` along `angle`.
    ShootVirus { virus_id: u32, angle: f32 },
}

/// Capabilities of a body variant.
pub trait Cell: Send + Sync {
    /// Get the common cell data.
    fn data(&self) -> &CellData;

    /// Get mutable cell data.
    fn data_mut(&mut self) -> &mut CellData;

    /// Whether this cell is willing to consume `prey`.
    fn can_eat(&self, _prey: &CellData, _ctx: &EatContext) -> bool {
        false
    }

    /// Called on the predator once `prey` has been consumed.
    fn on_eat(&mut self, prey: &CellData, _ctx: &EatContext) -> Reaction {
        self.data_mut().grow(prey.size_sq());
        Reaction::None
    }

    /// Called on the prey once `eater` has consumed it.
    fn on_eaten(&mut self, _eater: &CellData) -> Reaction {
        Reaction::None
    }

    /// Called when the cell is added to the world.
    fn on_add(&mut self, handle: QuadHandle) {
        self.data_mut().quad = Some(handle);
    }

    /// Called when the cell is removed from the world.
    fn on_remove(&mut self) {
        let data = self.data_mut();
        data.is_removed = true;
        data.is_moving = false;
        data.quad = None;
    }

    /// Distance covered this tick when steering toward a point `distance`
    /// away.
    fn get_speed(&self, _distance: f32, _speed_mult: f32) -> f32 {
        0.0
    }
}
