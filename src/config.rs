use crate::card::KeywordSet;
use crate::simulation::engine::{ComboParams, SimulationParams};
use crate::simulation::hand::HAND_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Upper bound on trials accepted from user input
pub const MAX_TRIALS: usize = 100_000;
/// Upper bound on the combo window accepted from user input
pub const MAX_COMBO_WINDOW: usize = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}

/// User-facing simulation settings, loadable from JSON.
/// Missing fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub min_lands: usize,
    pub max_lands: usize,
    /// Comma separated land name fragments
    pub land_keywords: String,
    /// Comma separated combo piece name fragments
    pub combo_keywords: String,
    pub combo_window: usize,
    pub trials: usize,
    pub seed: Option<u64>,
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            min_lands: 2,
            max_lands: 4,
            land_keywords: "Mountain".to_string(),
            combo_keywords: "Card A, Card B".to_string(),
            combo_window: 7,
            trials: 10_000,
            seed: None,
            parallel: false,
        }
    }
}

fn check_range(
    field: &'static str,
    value: usize,
    min: usize,
    max: usize,
) -> Result<usize, ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

impl SimulationConfig {
    /// Load settings from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Keepable-hand parameters, bounds-checked against the input limits
    pub fn simulation_params(&self) -> Result<SimulationParams, ConfigError> {
        Ok(SimulationParams {
            min_lands: check_range("min_lands", self.min_lands, 0, HAND_SIZE)?,
            max_lands: check_range("max_lands", self.max_lands, self.min_lands, HAND_SIZE)?,
            land_keywords: KeywordSet::parse(&self.land_keywords),
            trials: check_range("trials", self.trials, 1, MAX_TRIALS)?,
        })
    }

    /// Combo parameters, bounds-checked against the input limits
    pub fn combo_params(&self) -> Result<ComboParams, ConfigError> {
        Ok(ComboParams {
            combo_keywords: KeywordSet::parse(&self.combo_keywords),
            window_size: check_range("combo_window", self.combo_window, 1, MAX_COMBO_WINDOW)?,
        })
    }
}
