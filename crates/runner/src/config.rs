//! Configuration loading for the analysis
//!
//! Every field has a default, so `{}` is a complete configuration. Values
//! given on the command line are layered on top with [`AnalysisConfig::apply`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Root configuration of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of LHS states of the world
    pub sample_size: usize,
    pub seed: u64,
    pub policy: PolicyConfig,
    pub price_trend: PriceTrend,
    pub cart: CartSettings,
    pub sobol: SobolSettings,
    /// Directory receiving the CSV and JSON outputs
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_size: 10_000,
            seed: 7,
            policy: PolicyConfig::default(),
            price_trend: PriceTrend::default(),
            cart: CartSettings::default(),
            sobol: SobolSettings::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Lever values applied to every SOW
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// 0 = wait, 1 = invest
    pub investment_decision: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            investment_decision: 1.0,
        }
    }
}

/// Energy price trend explored by a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    Rising,
    Falling,
    #[default]
    RisingElectricity,
    RisingHeat,
    Custom { electricity: f64, heat: f64 },
}

impl PriceTrend {
    pub const PRESETS: [PriceTrend; 4] = [
        PriceTrend::Rising,
        PriceTrend::Falling,
        PriceTrend::RisingElectricity,
        PriceTrend::RisingHeat,
    ];

    /// Preset by name, e.g. `rising_heat`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::PRESETS.into_iter().find(|t| t.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PriceTrend::Rising => "rising",
            PriceTrend::Falling => "falling",
            PriceTrend::RisingElectricity => "rising_electricity",
            PriceTrend::RisingHeat => "rising_heat",
            PriceTrend::Custom { .. } => "custom",
        }
    }

    /// `pelectricity_dt`
    pub fn electricity(&self) -> f64 {
        match *self {
            PriceTrend::Rising | PriceTrend::RisingElectricity => 0.4,
            PriceTrend::Falling | PriceTrend::RisingHeat => -1.0,
            PriceTrend::Custom { electricity, .. } => electricity,
        }
    }

    /// `pheat_dt`
    pub fn heat(&self) -> f64 {
        match *self {
            PriceTrend::Rising | PriceTrend::RisingHeat => 0.7,
            PriceTrend::Falling | PriceTrend::RisingElectricity => -0.5,
            PriceTrend::Custom { heat, .. } => heat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSettings {
    pub enabled: bool,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_samples_leaf: 50,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SobolSettings {
    pub enabled: bool,
    /// Base sample count
    pub samples: usize,
    pub second_order: bool,
    /// Response whose variance is decomposed
    pub response: String,
}

impl Default for SobolSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            samples: 1000,
            second_order: false,
            response: "Regret".to_string(),
        }
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub sample_size: Option<usize>,
    pub seed: Option<u64>,
    pub price_trend: Option<PriceTrend>,
    pub output_dir: Option<PathBuf>,
    pub sobol_samples: Option<usize>,
    pub no_sobol: bool,
    pub no_cart: bool,
}

impl AnalysisConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(n) = overrides.sample_size {
            self.sample_size = n;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(trend) = overrides.price_trend {
            self.price_trend = trend;
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(n) = overrides.sobol_samples {
            self.sobol.samples = n;
        }
        if overrides.no_sobol {
            self.sobol.enabled = false;
        }
        if overrides.no_cart {
            self.cart.enabled = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_size == 0 {
            return Err(ConfigError::Invalid("sample_size must be positive".to_string()));
        }
        let decision = self.policy.investment_decision;
        if decision != 0.0 && decision != 1.0 {
            return Err(ConfigError::Invalid(format!(
                "investment_decision must be 0 or 1, got {decision}"
            )));
        }
        for (name, value) in [
            ("electricity", self.price_trend.electricity()),
            ("heat", self.price_trend.heat()),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} trend must lie in [-1, 1], got {value}"
                )));
            }
        }
        if self.cart.enabled && self.cart.min_samples_leaf == 0 {
            return Err(ConfigError::Invalid("min_samples_leaf must be at least 1".to_string()));
        }
        if self.sobol.enabled {
            if self.sobol.samples < 2 {
                return Err(ConfigError::Invalid("sobol samples must be at least 2".to_string()));
            }
            if self.sobol.response.is_empty() {
                return Err(ConfigError::Invalid("sobol response is empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
