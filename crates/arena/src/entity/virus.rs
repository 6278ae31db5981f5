//! Virus cell.

use super::cell::{Cell, CellData, CellType, EatContext, Reaction};
use crate::color::Color;
use glam::Vec2;

/// Default virus color (green).
pub const VIRUS_COLOR: Color = Color::new(51, 255, 51);

/// A virus that pops player cells and grows by eating ejected mass.
#[derive(Debug, Clone)]
pub struct Virus {
    data: CellData,
}

impl Virus {
    /// Create a new virus.
    pub fn new(node_id: u32, position: Vec2, size: f32, tick: u64) -> Self {
        let mut data = CellData::new(node_id, CellType::Virus, position, size, tick);
        data.color = VIRUS_COLOR;
        Self { data }
    }
}

impl Cell for Virus {
    fn data(&self) -> &CellData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut CellData {
        &mut self.data
    }

    /// Viruses only feed on ejected mass, and only while the population
    /// has room for another shot.
    fn can_eat(&self, prey: &CellData, ctx: &EatContext) -> bool {
        prey.cell_type == CellType::EjectedMass && ctx.virus_count < ctx.virus_max_amount
    }

    fn on_eat(&mut self, prey: &CellData, ctx: &EatContext) -> Reaction {
        self.data.grow(prey.size_sq());
        if self.data.size() < ctx.virus_max_size {
            return Reaction::None;
        }
        self.data.set_size(ctx.virus_min_size);
        Reaction::ShootVirus {
            virus_id: self.data.node_id,
            angle: prey.boost.angle(),
        }
    }

    fn on_eaten(&mut self, eater: &CellData) -> Reaction {
        if eater.cell_type == CellType::Player {
            Reaction::Pop {
                cell_id: eater.node_id,
            }
        } else {
            Reaction::None
        }
    }
}
