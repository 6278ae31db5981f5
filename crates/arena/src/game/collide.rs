//! Pair resolution against the spatial index.

use super::Game;
use crate::collision::{EatPair, EatRules, Manifold, classify, is_rigid, resolve_eat, rigid_push};
use crate::entity::{CellData, CellType, EatContext, Reaction};
use tracing::debug;

impl Game {
    pub(super) fn eat_context(&self) -> EatContext {
        EatContext {
            virus_count: self.world.virus_cells().len(),
            virus_max_amount: self.config.virus.max_amount,
            virus_min_size: self.config.virus.min_size,
            virus_max_size: self.config.virus.max_size,
        }
    }

    fn eat_rules(&self) -> EatRules {
        EatRules {
            tick: self.tick_count,
            mobile_physics: self.config.server.mobile_physics,
        }
    }

    /// Candidates overlapping the cell's current bound, itself excluded.
    fn neighbours(&self, cell_id: u32) -> Vec<u32> {
        let Some(cell) = self.world.get_cell(cell_id) else {
            return Vec::new();
        };
        let mut ids = self.world.query(&cell.data().bounds());
        ids.retain(|&id| id != cell_id);
        ids
    }

    /// Collisions of a boosted body: ejected mass is pushed rigidly (unless
    /// mobile physics), everything else goes through the eat rules.
    pub(super) fn resolve_moving_collisions(&mut self, cell_id: u32) {
        let rigid_ejects = !self.config.server.mobile_physics;

        for other_id in self.neighbours(cell_id) {
            let Some((m, other_type)) = self.manifold(cell_id, other_id) else {
                // The moving body itself is gone.
                if self.world.get_cell(cell_id).is_none() {
                    return;
                }
                continue;
            };
            if rigid_ejects && other_type == CellType::EjectedMass {
                self.resolve_rigid(&m);
            } else {
                self.resolve_collision(&m);
            }
        }
    }

    /// Collisions of a player cell: rigid against siblings that may not
    /// merge (and team-mates), eat rules otherwise.
    pub(super) fn resolve_player_collisions(&mut self, cell_id: u32) {
        for other_id in self.neighbours(cell_id) {
            let Some((m, _)) = self.manifold(cell_id, other_id) else {
                if self.world.get_cell(cell_id).is_none() {
                    return;
                }
                continue;
            };
            if self.check_rigid(&m) {
                self.resolve_rigid(&m);
            } else {
                self.resolve_collision(&m);
            }
        }
    }

    fn manifold(&self, cell_id: u32, other_id: u32) -> Option<(Manifold, CellType)> {
        let cell = self.world.get_cell(cell_id)?.data();
        let other = self.world.get_cell(other_id)?.data();
        Some((classify(cell, other), other.cell_type))
    }

    fn check_rigid(&self, m: &Manifold) -> bool {
        let (Some(a), Some(b)) = (self.world.player_cell(m.cell_id), self.world.player_cell(m.check_id)) else {
            return false;
        };
        let same_team = self.gamemode.have_teams()
            && match (a.cell_data.owner_id, b.cell_data.owner_id) {
                (Some(oa), Some(ob)) if oa != ob => {
                    let team_a = self.players.get(&oa).and_then(|p| p.team);
                    let team_b = self.players.get(&ob).and_then(|p| p.team);
                    team_a.is_some() && team_a == team_b
                }
                _ => false,
            };
        is_rigid(a, b, same_team, self.tick_count, self.config.server.mobile_physics)
    }

    fn resolve_rigid(&mut self, m: &Manifold) {
        let (Some(cell), Some(check)) = (self.world.get_cell(m.cell_id), self.world.get_cell(m.check_id)) else {
            return;
        };
        let Some((push_cell, push_check)) = rigid_push(m, cell.data(), check.data()) else {
            return;
        };

        let border = self.world.border;
        for (id, push) in [(m.cell_id, push_cell), (m.check_id, push_check)] {
            if let Some(entry) = self.world.get_cell_mut(id) {
                let data = entry.data_mut();
                data.position += push;
                data.check_border(&border);
            }
            self.world.refresh(id);
        }
    }

    /// Variant permission of the predator plus the gamemode override for
    /// cells of two different players.
    fn permits(&self, predator: &CellData, prey: &CellData, ctx: &EatContext) -> bool {
        let Some(entry) = self.world.get_cell(predator.node_id) else {
            return false;
        };
        if !entry.as_cell().can_eat(prey, ctx) {
            return false;
        }
        match (predator.owner_id, prey.owner_id) {
            (Some(a), Some(b)) if a != b => self.gamemode.can_eat(a, b, &self.players),
            _ => true,
        }
    }

    fn resolve_collision(&mut self, m: &Manifold) {
        let (Some(a), Some(b)) = (self.world.get_cell(m.cell_id), self.world.get_cell(m.check_id)) else {
            return;
        };
        let ctx = self.eat_context();
        let rules = self.eat_rules();
        let pair = resolve_eat(m, a.data(), b.data(), &rules, |predator, prey| {
            self.permits(predator, prey, &ctx)
        });
        if let Some(pair) = pair {
            self.apply_eat(pair, &ctx);
        }
    }

    /// Move the prey's mass into the predator, remove the prey and run the
    /// reactions both sides ask for.
    pub(super) fn apply_eat(&mut self, pair: EatPair, ctx: &EatContext) {
        if self.world.get_cell(pair.predator).is_none() {
            return;
        }
        let Some(mut prey) = self.world.remove_cell(pair.prey, Some(pair.predator)) else {
            return;
        };
        if let Some(owner_id) = prey.data().owner_id {
            if let Some(owner) = self.players.get_mut(&owner_id) {
                owner.remove_cell(pair.prey);
                if !owner.is_alive() {
                    debug!("Player {} lost their last cell", owner_id);
                }
            }
        }

        let Some(predator) = self.world.get_cell_mut(pair.predator) else {
            return;
        };
        let on_eat = predator.as_cell_mut().on_eat(prey.data(), ctx);
        let on_eaten = prey.as_cell_mut().on_eaten(predator.data());
        self.world.refresh(pair.predator);

        for reaction in [on_eat, on_eaten] {
            match reaction {
                Reaction::None => {}
                Reaction::Pop { cell_id } => self.pop_player_cell(cell_id),
                Reaction::ShootVirus { virus_id, angle } => self.shoot_virus(virus_id, angle),
            }
        }
    }
}
