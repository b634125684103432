// Configuration loading and parsing (classdraft.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::league::DraftType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Default file name looked up in the working directory when no explicit
/// path is given.
pub const DEFAULT_CONFIG_FILE: &str = "classdraft.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// `[sweeper]` table: cadence of the expired-turn sweep.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// How often to poll for expired turns.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Extra slack past the per-pick time limit before a turn counts as
    /// expired, absorbing processing latency.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig {
            interval_secs: default_interval_secs(),
            grace_secs: default_grace_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_grace_secs() -> u64 {
    5
}

/// `[demo]` table: parameters of the league seeded by the demo driver.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_participants")]
    pub participants: usize,
    #[serde(default = "default_players_per_team")]
    pub max_players_per_team: u32,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_draft_type")]
    pub draft_type: DraftType,
    #[serde(default = "default_time_limit")]
    pub time_limit_per_pick: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            participants: default_participants(),
            max_players_per_team: default_players_per_team(),
            pool_size: default_pool_size(),
            draft_type: default_draft_type(),
            time_limit_per_pick: default_time_limit(),
        }
    }
}

fn default_participants() -> usize {
    4
}

fn default_players_per_team() -> u32 {
    3
}

fn default_pool_size() -> usize {
    24
}

fn default_draft_type() -> DraftType {
    DraftType::Snake
}

fn default_time_limit() -> u64 {
    2
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the configuration.
///
/// With an explicit `path` the file must exist. With `None`, the default
/// file is used if present, otherwise built-in defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !path.exists() {
        if required {
            return Err(ConfigError::FileNotFound { path });
        }
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
        path: path.clone(),
        source,
    })?;
    let config: Config =
        toml::from_str(&raw).map_err(|source| ConfigError::ParseError { path, source })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.sweeper.interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "sweeper.interval_secs".into(),
            message: "must be at least 1 second".into(),
        });
    }
    if config.demo.participants < 2 {
        return Err(ConfigError::ValidationError {
            field: "demo.participants".into(),
            message: "a draft needs at least 2 participants".into(),
        });
    }
    if config.demo.max_players_per_team == 0 {
        return Err(ConfigError::ValidationError {
            field: "demo.max_players_per_team".into(),
            message: "rosters must hold at least 1 player".into(),
        });
    }
    if config.demo.time_limit_per_pick == 0 {
        return Err(ConfigError::ValidationError {
            field: "demo.time_limit_per_pick".into(),
            message: "per-pick time limit must be at least 1 second".into(),
        });
    }
    Ok(())
}
