//! Collision detection and resolution.
//!
//! This module handles cell-cell collisions including:
//! - Eating logic (when one cell consumes another)
//! - Rigid body collisions (pushing apart same-owner cells)
//!
//! Everything here is pure: callers read both cells, ask for a verdict and
//! apply it to the world themselves.

use crate::entity::{CellData, MASS_DIVISOR, PlayerCell};
use glam::Vec2;

/// Predator size must exceed prey size by this factor (different owners).
pub const EAT_SIZE_MULT: f32 = 1.11;

/// Ticks after birth during which same-owner cells neither merge nor collide
/// rigidly.
pub const SPLIT_RESTORE_TICKS: u64 = 13;

/// Rigid grace period under mobile physics.
pub const MOBILE_SPLIT_RESTORE_TICKS: u64 = 1;

/// Geometry of a candidate pair.
#[derive(Debug, Clone, Copy)]
pub struct Manifold {
    /// First cell ID
    pub cell_id: u32,
    /// Second cell ID
    pub check_id: u32,
    /// Displacement from cell to check.
    pub delta: Vec2,
    /// Squared distance.
    pub dist_sq: f32,
}

impl Manifold {
    #[inline]
    pub fn distance(&self) -> f32 {
        self.dist_sq.sqrt()
    }
}

/// Build the manifold of two cells.
#[inline]
pub fn classify(cell: &CellData, check: &CellData) -> Manifold {
    let delta = check.position - cell.position;
    Manifold {
        cell_id: cell.node_id,
        check_id: check.node_id,
        delta,
        dist_sq: delta.length_squared(),
    }
}

/// Whether two player cells push each other apart instead of eating.
///
/// `same_team` must only be set when the gamemode has teams and both owners
/// are on the same one.
pub fn is_rigid(a: &PlayerCell, b: &PlayerCell, same_team: bool, tick: u64, mobile_physics: bool) -> bool {
    let (da, db) = (&a.cell_data, &b.cell_data);
    let (Some(owner_a), Some(owner_b)) = (da.owner_id, db.owner_id) else {
        return false;
    };

    let grace = if mobile_physics {
        MOBILE_SPLIT_RESTORE_TICKS
    } else {
        SPLIT_RESTORE_TICKS
    };
    if da.get_age(tick) < grace || db.get_age(tick) < grace {
        return false; // just split => ignore
    }

    if owner_a != owner_b {
        // Team-mates can never merge with each other.
        return same_team;
    }
    !a.can_remerge || !b.can_remerge
}

/// Displacements that separate an overlapping rigid pair, each cell moving by
/// the other's share of the combined mass.
///
/// Returns `None` when the cells do not overlap or share a center.
pub fn rigid_push(m: &Manifold, cell: &CellData, check: &CellData) -> Option<(Vec2, Vec2)> {
    let d = m.distance();
    if d <= 0.0 {
        return None;
    }
    let r = cell.size() + check.size();
    let push = ((r - d) / d).min(r - d); // min extrusion force
    if push <= 0.0 {
        return None;
    }

    let (mass_cell, mass_check) = (cell.mass(), check.mass());
    let total = mass_cell + mass_check;
    if total <= 0.0 {
        return None;
    }
    let m1 = push * mass_cell / total;
    let m2 = push * mass_check / total;
    Some((-m.delta * m2, m.delta * m1))
}

/// Parameters of the eat test.
#[derive(Debug, Clone, Copy)]
pub struct EatRules {
    pub tick: u64,
    pub mobile_physics: bool,
}

impl EatRules {
    /// Fraction of the prey size that must be swallowed.
    #[inline]
    fn div(&self) -> f32 {
        if self.mobile_physics { 20.0 } else { 3.0 }
    }
}

/// A successful eat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EatPair {
    pub predator: u32,
    pub prey: u32,
}

/// Decide whether one of the two cells eats the other.
///
/// The larger cell is the predator. `permits(predator, prey)` is consulted
/// for pairs with different owners and carries the variant and gamemode
/// permissions.
pub fn resolve_eat<F>(m: &Manifold, a: &CellData, b: &CellData, rules: &EatRules, permits: F) -> Option<EatPair>
where
    F: FnOnce(&CellData, &CellData) -> bool,
{
    let (prey, predator) = if a.size() > b.size() { (b, a) } else { (a, b) };
    if prey.is_removed || predator.is_removed || prey.node_id == predator.node_id {
        return None;
    }

    // check eating distance
    let reach = predator.size() - prey.size() / rules.div();
    if reach <= 0.0 || m.dist_sq >= reach * reach {
        return None;
    }

    let same_owner = prey.owner_id.is_some() && prey.owner_id == predator.owner_id;
    if same_owner {
        if prey.get_age(rules.tick) < SPLIT_RESTORE_TICKS || predator.get_age(rules.tick) < SPLIT_RESTORE_TICKS {
            return None;
        }
    } else if predator.size() <= prey.size() * EAT_SIZE_MULT || !permits(predator, prey) {
        return None;
    }

    Some(EatPair {
        predator: predator.node_id,
        prey: prey.node_id,
    })
}

/// Calculate mass from size.
#[inline]
pub fn size_to_mass(size: f32) -> f32 {
    (size * size) / MASS_DIVISOR
}

/// Calculate size from mass.
#[inline]
pub fn mass_to_size(mass: f32) -> f32 {
    (MASS_DIVISOR * mass).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CellType;

    const RULES: EatRules = EatRules {
        tick: 100,
        mobile_physics: false,
    };

    fn cell(id: u32, kind: CellType, x: f32, size: f32) -> CellData {
        CellData::new(id, kind, Vec2::new(x, 0.0), size, 0)
    }

    fn owned(id: u32, owner: u32, x: f32, size: f32, born: u64) -> PlayerCell {
        PlayerCell::new(id, owner, Vec2::new(x, 0.0), size, born)
    }

    #[test]
    fn test_size_mass_conversion() {
        let mass = 100.0;
        let size = mass_to_size(mass);
        let back = size_to_mass(size);
        assert!((back - mass).abs() < 0.001);
    }

    #[test]
    fn test_larger_cell_eats_nearby_food() {
        let player = cell(1, CellType::Player, 0.0, 10.0);
        let food = cell(2, CellType::Food, 0.0, 5.0);
        let m = classify(&player, &food);

        let pair = resolve_eat(&m, &player, &food, &RULES, |_, _| true);
        assert_eq!(pair, Some(EatPair { predator: 1, prey: 2 }));

        // Argument order does not matter.
        let m = classify(&food, &player);
        let pair = resolve_eat(&m, &food, &player, &RULES, |_, _| true);
        assert_eq!(pair, Some(EatPair { predator: 1, prey: 2 }));
    }

    #[test]
    fn test_eat_requires_swallowing_distance() {
        let player = cell(1, CellType::Player, 0.0, 100.0);
        // Reach is 100 - 30/3 = 90.
        let near = cell(2, CellType::Player, 89.0, 30.0);
        let far = cell(3, CellType::Player, 90.0, 30.0);

        assert!(resolve_eat(&classify(&player, &near), &player, &near, &RULES, |_, _| true).is_some());
        assert!(resolve_eat(&classify(&player, &far), &player, &far, &RULES, |_, _| true).is_none());
    }

    #[test]
    fn test_size_margin_is_strict() {
        let prey = cell(2, CellType::Player, 0.0, 100.0);
        for size in [100.0, 105.0, 110.0, 111.0] {
            let predator = cell(1, CellType::Player, 0.0, size);
            let m = classify(&predator, &prey);
            assert!(resolve_eat(&m, &predator, &prey, &RULES, |_, _| true).is_none(), "size {}", size);
        }
        let predator = cell(1, CellType::Player, 0.0, 111.5);
        let m = classify(&predator, &prey);
        assert!(resolve_eat(&m, &predator, &prey, &RULES, |_, _| true).is_some());
    }

    #[test]
    fn test_permission_is_consulted() {
        let predator = cell(1, CellType::Player, 0.0, 200.0);
        let prey = cell(2, CellType::Player, 0.0, 50.0);
        let m = classify(&predator, &prey);
        assert!(resolve_eat(&m, &predator, &prey, &RULES, |_, _| false).is_none());
    }

    #[test]
    fn test_young_same_owner_cells_never_merge() {
        let a = owned(1, 7, 0.0, 100.0, 95);
        let b = owned(2, 7, 0.0, 40.0, 0);
        let m = classify(&a.cell_data, &b.cell_data);
        assert!(resolve_eat(&m, &a.cell_data, &b.cell_data, &RULES, |_, _| true).is_none());

        // Same owner skips the size margin once both are old enough.
        let a = owned(1, 7, 0.0, 41.0, 0);
        let m = classify(&a.cell_data, &b.cell_data);
        let pair = resolve_eat(&m, &a.cell_data, &b.cell_data, &RULES, |_, _| false);
        assert_eq!(pair, Some(EatPair { predator: 1, prey: 2 }));
    }

    #[test]
    fn test_removed_cells_are_ignored() {
        let predator = cell(1, CellType::Player, 0.0, 200.0);
        let mut prey = cell(2, CellType::Food, 0.0, 10.0);
        prey.is_removed = true;
        let m = classify(&predator, &prey);
        assert!(resolve_eat(&m, &predator, &prey, &RULES, |_, _| true).is_none());
    }

    #[test]
    fn test_rigid_same_owner() {
        let mut a = owned(1, 7, 0.0, 50.0, 0);
        let mut b = owned(2, 7, 60.0, 50.0, 0);

        assert!(!is_rigid(&a, &b, false, 5, false), "young cells pass through");
        assert!(is_rigid(&a, &b, false, 20, false));
        assert!(is_rigid(&a, &b, false, 5, true), "mobile grace is one tick");

        a.can_remerge = true;
        assert!(is_rigid(&a, &b, false, 20, false));
        b.can_remerge = true;
        assert!(!is_rigid(&a, &b, false, 20, false));
    }

    #[test]
    fn test_rigid_teammates() {
        let a = owned(1, 7, 0.0, 50.0, 0);
        let b = owned(2, 8, 60.0, 50.0, 0);
        assert!(is_rigid(&a, &b, true, 20, false));
        assert!(!is_rigid(&a, &b, false, 20, false));
    }

    #[test]
    fn test_rigid_push_separates_by_mass_share() {
        let a = cell(1, CellType::Player, 0.0, 30.0);
        let b = cell(2, CellType::Player, 40.0, 30.0);
        let m = classify(&a, &b);

        // Overlap 20, equal masses: each moves 10 along the axis.
        let (da, db) = rigid_push(&m, &a, &b).unwrap();
        assert!((da.x + 10.0).abs() < 1e-4);
        assert!((db.x - 10.0).abs() < 1e-4);

        let c = cell(3, CellType::Player, 100.0, 30.0);
        assert!(rigid_push(&classify(&a, &c), &a, &c).is_none());
    }
}
