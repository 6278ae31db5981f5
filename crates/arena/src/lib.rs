//! Native Arena simulation core.
//!
//! A single-writer, fixed-timestep simulation of circular bodies on a bounded
//! plane: food, viruses, ejected mass and player-controlled cell clusters
//! that eat, split, merge and decay. Input arrives through a command inbox and
//! every tick yields a [`WorldDelta`]; the [`runner`] drives ticks on a tokio
//! runtime and broadcasts the results.

pub mod collision;
pub mod color;
pub mod config;
pub mod delta;
pub mod entity;
pub mod error;
pub mod game;
pub mod gamemodes;
pub mod inbox;
pub mod player;
pub mod runner;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use color::Color;
pub use config::Config;
pub use delta::{BodyView, GameStats, Leaderboard, LeaderboardEntry, RemovedBody, Viewport, WorldDelta};
pub use error::{ConfigError, InboxClosed};
pub use game::{Game, StepOutput};
pub use inbox::{Command, CommandSender};
pub use runner::{Broadcasts, run};
