//! Game configuration.
//!
//! Every field has a serde default, so a partial `config.toml` only needs to
//! name the values it overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub eject: EjectConfig,
}

impl Config {
    /// Load configuration from `config.toml`, writing the defaults there when
    /// the file does not exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_or_create(Path::new("config.toml"))
    }

    /// Load configuration from `path`, creating it with defaults if missing.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_path(path);
        }

        info!(path = %path.display(), "No config found, creating default config");
        let default_config = Self::default();
        let contents = toml::to_string_pretty(&default_config)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(default_config)
    }

    /// Read and validate an existing config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("border.width", self.border.width)?;
        positive("border.height", self.border.height)?;
        positive("server.tick_interval_ms", self.server.tick_interval_ms as f64)?;
        positive("server.spawn_interval", self.server.spawn_interval as f64)?;
        positive("player.max_cells", self.player.max_cells as f64)?;
        positive("player.min_size", self.player.min_size)?;
        positive("virus.max_cells", self.virus.max_cells as f64)?;

        ordered("player.min_size", self.player.min_size, "player.max_size", self.player.max_size)?;
        ordered("food.min_size", self.food.min_size, "food.max_size", self.food.max_size)?;
        ordered(
            "food.min_amount",
            self.food.min_amount as f32,
            "food.max_amount",
            self.food.max_amount as f32,
        )?;
        ordered("virus.min_size", self.virus.min_size, "virus.max_size", self.virus.max_size)?;
        ordered(
            "virus.min_amount",
            self.virus.min_amount as f32,
            "virus.max_amount",
            self.virus.max_amount as f32,
        )?;

        if self.server.gamemode > 1 {
            return Err(ConfigError::UnknownGamemode(self.server.gamemode));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: impl Into<f64>) -> Result<(), ConfigError> {
    let value = value.into();
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn ordered(min_field: &'static str, min: f32, max_field: &'static str, max: f32) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange {
            min_field,
            min: min.into(),
            max_field,
            max: max.into(),
        })
    }
}

/// Simulation cadence and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Game mode (0=FFA, 1=Teams).
    #[serde(default)]
    pub gamemode: u32,
    /// Enable mobile physics (looser eat threshold, shorter grace, no auto-split).
    #[serde(default)]
    pub mobile_physics: bool,
    /// Ticks between spawn rounds.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: u64,
    /// RNG seed for reproducible runs (random when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Base view box width before scaling.
    #[serde(default = "default_view_base_x")]
    pub view_base_x: f32,
    /// Base view box height before scaling.
    #[serde(default = "default_view_base_y")]
    pub view_base_y: f32,
    /// Lower bound of the view scale.
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    /// Number of leaderboard entries.
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            gamemode: 0,
            mobile_physics: false,
            spawn_interval: default_spawn_interval(),
            seed: None,
            view_base_x: default_view_base_x(),
            view_base_y: default_view_base_y(),
            min_scale: default_min_scale(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

fn default_tick_interval() -> u64 {
    40
}
fn default_spawn_interval() -> u64 {
    20
}
fn default_view_base_x() -> f32 {
    1920.0
}
fn default_view_base_y() -> f32 {
    1080.0
}
fn default_min_scale() -> f32 {
    0.15
}
fn default_leaderboard_size() -> usize {
    10
}

/// World border configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_size")]
    pub width: f32,
    #[serde(default = "default_border_size")]
    pub height: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_size(),
            height: default_border_size(),
        }
    }
}

fn default_border_size() -> f32 {
    14142.135
}

/// Player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_start_size")]
    pub start_size: f32,
    #[serde(default = "default_player_min_size")]
    pub min_size: f32,
    #[serde(default = "default_player_max_size")]
    pub max_size: f32,
    #[serde(default = "default_player_min_split")]
    pub min_split_size: f32,
    #[serde(default = "default_player_min_eject")]
    pub min_eject_size: f32,
    #[serde(default = "default_player_max_cells")]
    pub max_cells: usize,
    /// Movement speed multiplier.
    #[serde(default = "default_player_speed")]
    pub speed: f32,
    #[serde(default = "default_player_decay_rate")]
    pub decay_rate: f32,
    /// Mass above which decay runs ten times faster (0 = disabled).
    #[serde(default)]
    pub decay_cap: f32,
    /// Seconds before split cells may remerge.
    #[serde(default = "default_player_recombine_time")]
    pub recombine_time: f32,
    /// Seconds a disconnected player's cells stay in the world (negative = forever).
    #[serde(default = "default_player_disconnect_time")]
    pub disconnect_time: i64,
    #[serde(default = "default_player_split_velocity")]
    pub split_velocity: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_size: default_player_start_size(),
            min_size: default_player_min_size(),
            max_size: default_player_max_size(),
            min_split_size: default_player_min_split(),
            min_eject_size: default_player_min_eject(),
            max_cells: default_player_max_cells(),
            speed: default_player_speed(),
            decay_rate: default_player_decay_rate(),
            decay_cap: 0.0,
            recombine_time: default_player_recombine_time(),
            disconnect_time: default_player_disconnect_time(),
            split_velocity: default_player_split_velocity(),
        }
    }
}

fn default_player_start_size() -> f32 {
    31.623
}
fn default_player_min_size() -> f32 {
    31.623
}
fn default_player_max_size() -> f32 {
    1500.0
}
fn default_player_min_split() -> f32 {
    60.0
}
fn default_player_min_eject() -> f32 {
    56.569
}
fn default_player_max_cells() -> usize {
    16
}
fn default_player_speed() -> f32 {
    1.0
}
fn default_player_decay_rate() -> f32 {
    0.002
}
fn default_player_recombine_time() -> f32 {
    30.0
}
fn default_player_disconnect_time() -> i64 {
    -1
}
fn default_player_split_velocity() -> f32 {
    780.0
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    #[serde(default = "default_food_min_size")]
    pub min_size: f32,
    #[serde(default = "default_food_max_size")]
    pub max_size: f32,
    #[serde(default = "default_food_min_amount")]
    pub min_amount: usize,
    #[serde(default = "default_food_max_amount")]
    pub max_amount: usize,
    #[serde(default = "default_food_spawn_amount")]
    pub spawn_amount: usize,
    /// Spawn food at a random size between min and max.
    #[serde(default = "default_food_mass_grow")]
    pub mass_grow: bool,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            min_size: default_food_min_size(),
            max_size: default_food_max_size(),
            min_amount: default_food_min_amount(),
            max_amount: default_food_max_amount(),
            spawn_amount: default_food_spawn_amount(),
            mass_grow: default_food_mass_grow(),
        }
    }
}

fn default_food_min_size() -> f32 {
    10.0
}
fn default_food_max_size() -> f32 {
    20.0
}
fn default_food_min_amount() -> usize {
    1000
}
fn default_food_max_amount() -> usize {
    2000
}
fn default_food_spawn_amount() -> usize {
    30
}
fn default_food_mass_grow() -> bool {
    true
}

/// Virus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    #[serde(default = "default_virus_min_size")]
    pub min_size: f32,
    #[serde(default = "default_virus_max_size")]
    pub max_size: f32,
    #[serde(default = "default_virus_min_amount")]
    pub min_amount: usize,
    #[serde(default = "default_virus_max_amount")]
    pub max_amount: usize,
    /// Boost given to a virus shot out of a full virus.
    #[serde(default = "default_virus_velocity")]
    pub velocity: f32,
    /// Maximum total cells a player can have after a virus pop.
    #[serde(default = "default_virus_max_cells")]
    pub max_cells: usize,
    /// Minimum mass per piece when a virus pops a player.
    /// A higher value produces fewer, larger pieces.
    #[serde(default = "default_virus_split_div")]
    pub split_div: f32,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            min_size: default_virus_min_size(),
            max_size: default_virus_max_size(),
            min_amount: default_virus_min_amount(),
            max_amount: default_virus_max_amount(),
            velocity: default_virus_velocity(),
            max_cells: default_virus_max_cells(),
            split_div: default_virus_split_div(),
        }
    }
}

fn default_virus_min_size() -> f32 {
    100.0
}
fn default_virus_max_size() -> f32 {
    141.421
}
fn default_virus_min_amount() -> usize {
    50
}
fn default_virus_max_amount() -> usize {
    100
}
fn default_virus_velocity() -> f32 {
    780.0
}
fn default_virus_max_cells() -> usize {
    16
}
fn default_virus_split_div() -> f32 {
    36.0
}

/// Ejected mass configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    #[serde(default = "default_eject_size")]
    pub size: f32,
    #[serde(default = "default_eject_size_loss")]
    pub size_loss: f32,
    /// Minimum ticks between two ejects of the same player.
    #[serde(default = "default_eject_cooldown")]
    pub cooldown: u64,
    #[serde(default = "default_eject_velocity")]
    pub velocity: f32,
    /// Chance that a new player spawns from a resting ejected mass.
    #[serde(default = "default_eject_spawn_percent")]
    pub spawn_percent: f32,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            size: default_eject_size(),
            size_loss: default_eject_size_loss(),
            cooldown: default_eject_cooldown(),
            velocity: default_eject_velocity(),
            spawn_percent: default_eject_spawn_percent(),
        }
    }
}

fn default_eject_size() -> f32 {
    40.0
}
fn default_eject_size_loss() -> f32 {
    45.0
}
fn default_eject_cooldown() -> u64 {
    3
}
fn default_eject_velocity() -> f32 {
    780.0
}
fn default_eject_spawn_percent() -> f32 {
    0.5
}
