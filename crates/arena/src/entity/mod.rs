//! Game entities (cells).
//!
//! This module defines all cell types in the game.

mod cell;
mod ejected_mass;
mod food;
mod player_cell;
mod virus;

pub use cell::{
    angle_direction, BoostData, Cell, CellData, CellType, EatContext, Reaction, MASS_DIVISOR,
    MIN_BOOST_DISTANCE,
};
pub use ejected_mass::EjectedMass;
pub use food::Food;
pub use player_cell::PlayerCell;
pub use virus::{Virus, VIRUS_COLOR};
