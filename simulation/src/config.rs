//! Game configuration
//!
//! Tunable startup parameters, loaded from JSON. Missing keys fall back to
//! the defaults, so a config file only needs the values it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// RNG seed; the same seed replays the same game
    pub seed: u64,
    pub player_id: String,
    pub player_name: String,
    pub starting_money: u64,
    pub starting_fields: u32,
    /// Real milliseconds between ticks at speed 1.0
    pub tick_interval_ms: u64,
    pub game_speed: f64,
    /// Ticks between autosaves; 0 disables autosave
    pub autosave_interval_ticks: u64,
    pub save_path: Option<PathBuf>,
    pub notifications: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            player_id: "player1".to_string(),
            player_name: "Farmer player1".to_string(),
            starting_money: 500,
            starting_fields: 3,
            tick_interval_ms: 1000,
            game_speed: 1.0,
            autosave_interval_ticks: 30,
            save_path: None,
            notifications: true,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.game_speed > 0.0 && self.game_speed.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "game_speed must be positive, got {}",
                self.game_speed
            )));
        }
        if self.starting_fields == 0 {
            return Err(ConfigError::Invalid("starting_fields must be at least 1".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be at least 1".into()));
        }
        Ok(())
    }

    /// Config with a different seed, for running many independent farms
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }
}
