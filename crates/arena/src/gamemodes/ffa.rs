use super::{GameMode, player_mass};
use crate::delta::LeaderboardEntry;
use crate::player::Player;
use crate::world::World;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Free for all: everyone may eat everyone.
#[derive(Debug, Default)]
pub struct Ffa;

impl Ffa {
    pub fn new() -> Self {
        Self
    }
}

impl GameMode for Ffa {
    fn name(&self) -> &str {
        "FFA"
    }

    fn id(&self) -> u32 {
        0
    }

    fn on_player_join(&self, _player: &mut Player, _rng: &mut StdRng) {}

    fn can_eat(&self, _owner_id: u32, _other_owner_id: u32, _players: &HashMap<u32, Player>) -> bool {
        true
    }

    fn get_leaderboard(&self, world: &World, players: &HashMap<u32, Player>) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = players
            .values()
            .filter(|player| player.is_alive())
            .map(|player| LeaderboardEntry {
                id: player.id,
                name: player.display_name().to_string(),
                score: player_mass(world, player),
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        entries
    }
}
