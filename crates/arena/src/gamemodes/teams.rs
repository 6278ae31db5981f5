use super::{GameMode, player_mass};
use crate::color::Color;
use crate::delta::LeaderboardEntry;
use crate::player::Player;
use crate::world::World;
use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::HashMap;

pub const TEAM_COUNT: u8 = 3;

/// Three teams; team-mates cannot eat each other and collide rigidly.
#[derive(Debug, Default)]
pub struct Teams;

impl Teams {
    pub fn new() -> Self {
        Self
    }

    fn team_color(team: u8, rng: &mut StdRng) -> Color {
        let fuzz = 38;

        let base_color = match team {
            0 => (255, 0, 0), // Red
            1 => (0, 255, 0), // Green
            _ => (0, 0, 255), // Blue
        };

        let r = (base_color.0 + rng.random_range(0..fuzz)).clamp(0, 255) as u8;
        let g = (base_color.1 + rng.random_range(0..fuzz)).clamp(0, 255) as u8;
        let b = (base_color.2 + rng.random_range(0..fuzz)).clamp(0, 255) as u8;

        Color::new(r, g, b)
    }
}

impl GameMode for Teams {
    fn name(&self) -> &str {
        "Teams"
    }

    fn id(&self) -> u32 {
        1
    }

    fn have_teams(&self) -> bool {
        true
    }

    fn on_player_join(&self, player: &mut Player, rng: &mut StdRng) {
        let team = *player.team.get_or_insert_with(|| rng.random_range(0..TEAM_COUNT));
        player.color = Self::team_color(team, rng);
    }

    fn on_spawn(&self, player: &mut Player, _world: &World, rng: &mut StdRng) -> Option<Vec2> {
        if let Some(team) = player.team {
            player.color = Self::team_color(team, rng);
        }
        None
    }

    fn can_eat(&self, owner_id: u32, other_owner_id: u32, players: &HashMap<u32, Player>) -> bool {
        if owner_id == other_owner_id {
            return true;
        }

        let team_a = players.get(&owner_id).and_then(|p| p.team);
        let team_b = players.get(&other_owner_id).and_then(|p| p.team);

        match (team_a, team_b) {
            (Some(ta), Some(tb)) => ta != tb,
            _ => true,
        }
    }

    fn get_leaderboard(&self, world: &World, players: &HashMap<u32, Player>) -> Vec<LeaderboardEntry> {
        let mut team_mass = [0.0f32; TEAM_COUNT as usize];
        let mut total_mass = 0.0;

        let mut ordered: Vec<&Player> = players.values().collect();
        ordered.sort_unstable_by_key(|p| p.id);
        for player in ordered {
            let mass = player_mass(world, player);
            if let Some(t) = player.team.filter(|&t| t < TEAM_COUNT) {
                team_mass[t as usize] += mass;
            }
            total_mass += mass;
        }

        if total_mass <= 0.0 {
            return Vec::new();
        }
        team_mass
            .iter()
            .enumerate()
            .map(|(i, &mass)| LeaderboardEntry {
                id: i as u32,
                name: format!("Team {}", i),
                score: mass / total_mass,
            })
            .collect()
    }
}
