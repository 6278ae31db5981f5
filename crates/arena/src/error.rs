//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load or validate a [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{min_field} ({min}) must not exceed {max_field} ({max})")]
    InvertedRange {
        min_field: &'static str,
        min: f64,
        max_field: &'static str,
        max: f64,
    },
    #[error("unknown gamemode {0}")]
    UnknownGamemode(u32),
}

/// The game loop has shut down and no longer accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("game inbox is closed")]
pub struct InboxClosed;
