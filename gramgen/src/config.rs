//! Generator Configuration
//!
//! Tunables for a generation run. Every field has a default, so a TOML file
//! only needs to name the values it changes:
//!
//! ```toml
//! mode = "shrink"
//! seed = 42
//! plus_max = 4
//!
//! [revote]
//! ratio = 3
//! floor = 20
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("`{field}` must be a finite probability, got {value}")]
    InvalidProbability { field: &'static str, value: f64 },
}

const DEFAULT_REP_PROBABILITY: f64 = 0.1;
const DEFAULT_OPTIONAL_PROBABILITY: f64 = 0.5;

/// Generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Alternatives are chosen uniformly.
    #[default]
    Normal,
    /// Alternatives closer to an all-terminal derivation are preferred.
    Shrink,
}

/// Configuration for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Initial generation mode.
    pub mode: Mode,

    /// Seed for the run's random generator. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Upper bound of repetitions drawn by the Plus handler.
    pub plus_max: u32,

    /// Probability that the Rep handler repeats its children once.
    pub rep_probability: f64,

    /// Probability that the default Optional policy expands its children.
    pub optional_probability: f64,

    /// Repetition bound for `*` and `+` in regex terminal templates.
    pub regex_max_repeat: u32,

    /// Over-visited edge re-vote in the weighted handler. Off when `None`.
    pub revote: Option<RevoteConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            seed: None,
            plus_max: 10,
            rep_probability: DEFAULT_REP_PROBABILITY,
            optional_probability: DEFAULT_OPTIONAL_PROBABILITY,
            regex_max_repeat: 10,
            revote: None,
        }
    }
}

/// Thresholds for the re-vote heuristic.
///
/// With `votes` the summed visit count of the siblings of a chosen edge,
/// the choice is re-drawn over all children when `votes > 0` and the chosen
/// edge was taken more than `ratio * votes` times, or when `votes == 0` and
/// it was taken more than `floor` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevoteConfig {
    pub ratio: u32,
    pub floor: u32,
}

impl Default for RevoteConfig {
    fn default() -> Self {
        Self { ratio: 3, floor: 20 }
    }
}

impl GeneratorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Same configuration with a fixed seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        config.plus_max = config.plus_max.max(1);
        for (field, value) in [
            ("rep_probability", config.rep_probability),
            ("optional_probability", config.optional_probability),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidProbability { field, value });
            }
        }
        config.rep_probability = config.rep_probability.clamp(0.0, 1.0);
        config.optional_probability = config.optional_probability.clamp(0.0, 1.0);
        Ok(config)
    }

    /// `rep_probability` as a usable probability. Non-finite values fall
    /// back to the default.
    pub(crate) fn rep_chance(&self) -> f64 {
        probability(self.rep_probability, DEFAULT_REP_PROBABILITY)
    }

    /// `optional_probability` as a usable probability.
    pub(crate) fn optional_chance(&self) -> f64 {
        probability(self.optional_probability, DEFAULT_OPTIONAL_PROBABILITY)
    }

    /// Reads a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}

fn probability(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}
