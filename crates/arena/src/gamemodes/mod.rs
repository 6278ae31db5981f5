use crate::delta::LeaderboardEntry;
use crate::game::Game;
use crate::player::Player;
use crate::world::World;
use glam::Vec2;
use rand::rngs::StdRng;
use std::collections::HashMap;

pub mod ffa;
pub mod teams;

/// Pluggable game rules consulted by the tick pipeline.
pub trait GameMode: Send + Sync {
    fn name(&self) -> &str;
    fn id(&self) -> u32;

    /// Whether team-mates collide rigidly and may not eat each other.
    fn have_teams(&self) -> bool {
        false
    }

    /// Multiplier applied to the configured decay rate.
    fn decay_modifier(&self) -> f32 {
        1.0
    }

    fn on_player_join(&self, player: &mut Player, rng: &mut StdRng);

    /// Prepare a player for (re)spawning. May return a forced spawn position.
    fn on_spawn(&self, _player: &mut Player, _world: &World, _rng: &mut StdRng) -> Option<Vec2> {
        None
    }

    /// Eat override for cells of two different owners.
    fn can_eat(&self, owner_id: u32, other_owner_id: u32, players: &HashMap<u32, Player>) -> bool;

    fn get_leaderboard(&self, world: &World, players: &HashMap<u32, Player>) -> Vec<LeaderboardEntry>;

    fn on_tick(&mut self, _game: &mut Game) {}
}

pub fn get_gamemode(id: u32) -> Box<dyn GameMode> {
    match id {
        1 => Box::new(teams::Teams::new()),
        _ => Box::new(ffa::Ffa::new()),
    }
}

/// Total mass of a player's live cells.
pub(crate) fn player_mass(world: &World, player: &Player) -> f32 {
    player
        .cells
        .iter()
        .filter_map(|&cell_id| world.get_cell(cell_id))
        .map(|cell| cell.data().mass())
        .sum()
}
