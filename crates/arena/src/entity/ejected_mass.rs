//! Ejected mass cell.

use super::cell::{Cell, CellData, CellType};
use crate::color::Color;
use glam::Vec2;

/// Mass ejected by a player.
#[derive(Debug, Clone)]
pub struct EjectedMass {
    data: CellData,
}

impl EjectedMass {
    /// Create new ejected mass.
    pub fn new(node_id: u32, position: Vec2, size: f32, tick: u64) -> Self {
        Self {
            data: CellData::new(node_id, CellType::EjectedMass, position, size, tick),
        }
    }

    /// Set the color (inherited from the ejecting cell).
    pub fn with_color(mut self, color: Color) -> Self {
        self.data.color = color;
        self
    }
}

impl Cell for EjectedMass {
    fn data(&self) -> &CellData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut CellData {
        &mut self.data
    }
}
