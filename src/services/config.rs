use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::domain::period::TimePeriodType;

pub const MIN_SIMULATIONS: usize = 100;
pub const MAX_SIMULATIONS: usize = 100_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid capacity value: {0}")]
    InvalidCapacity(String),
    #[error("default capacity per quarter must be positive, got {0}")]
    NonPositiveDefaultCapacity(f64),
    #[error("number of simulations must be between {MIN_SIMULATIONS} and {MAX_SIMULATIONS}, got {0}")]
    SimulationsOutOfRange(usize),
    #[error("progress update interval must be greater than zero")]
    InvalidProgressInterval,
    #[error("max periods per item must be greater than zero")]
    InvalidPeriodLimit,
}

/// Run settings. Every field has a default so a config file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    #[serde(deserialize_with = "deserialize_capacity")]
    pub default_capacity_per_quarter: f64,
    pub default_num_simulations: usize,
    pub progress_update_interval: usize,
    pub period_type: TimePeriodType,
    pub max_periods_per_item: u32,
    pub seed: Option<u64>,
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_capacity_per_quarter: 1300.0,
            default_num_simulations: 20_000,
            progress_update_interval: 100,
            period_type: TimePeriodType::Quarterly,
            max_periods_per_item: 400,
            seed: None,
            parallel: false,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_num_simulations(self.default_num_simulations)?;
        if !self.default_capacity_per_quarter.is_finite() {
            return Err(ConfigError::InvalidCapacity(
                self.default_capacity_per_quarter.to_string(),
            ));
        }
        if self.default_capacity_per_quarter <= 0.0 {
            return Err(ConfigError::NonPositiveDefaultCapacity(
                self.default_capacity_per_quarter,
            ));
        }
        if self.progress_update_interval == 0 {
            return Err(ConfigError::InvalidProgressInterval);
        }
        if self.max_periods_per_item == 0 {
            return Err(ConfigError::InvalidPeriodLimit);
        }
        Ok(())
    }
}

pub fn validate_num_simulations(value: usize) -> Result<usize, ConfigError> {
    if (MIN_SIMULATIONS..=MAX_SIMULATIONS).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::SimulationsOutOfRange(value))
    }
}

pub fn load_config_from_yaml_file<P: AsRef<Path>>(path: P) -> Result<SimulationConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    deserialize_config_from_yaml_str(&contents)
}

pub fn deserialize_config_from_yaml_str(input: &str) -> Result<SimulationConfig, ConfigError> {
    let config: SimulationConfig = serde_yaml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

/// Parses a capacity such as `1300`, `1300.5` or `1300/q`.
pub fn parse_capacity_value(value: &str) -> Result<f64, ConfigError> {
    let trimmed = value.trim();
    let number = trimmed
        .strip_suffix("/q")
        .or_else(|| trimmed.strip_suffix("/Q"))
        .unwrap_or(trimmed)
        .trim();
    let capacity: f64 = number
        .parse()
        .map_err(|_| ConfigError::InvalidCapacity(value.to_string()))?;
    if capacity.is_finite() {
        Ok(capacity)
    } else {
        Err(ConfigError::InvalidCapacity(value.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum CapacityValue {
    Number(f64),
    Text(String),
}

impl CapacityValue {
    pub(crate) fn resolve(self) -> Result<f64, ConfigError> {
        match self {
            CapacityValue::Number(value) if value.is_finite() => Ok(value),
            CapacityValue::Number(value) => Err(ConfigError::InvalidCapacity(value.to_string())),
            CapacityValue::Text(text) => parse_capacity_value(&text),
        }
    }
}

pub(crate) fn deserialize_capacity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    CapacityValue::deserialize(deserializer)?
        .resolve()
        .map_err(serde::de::Error::custom)
}
