//! Deep uncertainties
//!
//! Every uncertainty maps a unit draw `u` in `[0, 1)` onto its range through
//! the inverse CDF, which lets Latin hypercube and Saltelli designs work on
//! the unit cube regardless of the distribution.

use crate::error::{RdmError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, LogNormal, Normal, Triangular};

/// Quantile used as the effective bound of unbounded distributions
const TAIL_QUANTILE: f64 = 0.001;

/// Keeps the inverse CDF of unbounded distributions finite
const UNIT_EPSILON: f64 = 1e-12;

/// Distribution of one uncertain parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    /// Inclusive integer range
    Integer { min: i64, max: i64 },
    Point { value: f64 },
}

/// A named uncertain model parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uncertainty {
    pub name: String,
    pub distribution: Distribution,
}

impl Uncertainty {
    pub fn new(name: impl Into<String>, distribution: Distribution) -> Self {
        Self {
            name: name.into(),
            distribution,
        }
    }

    pub fn uniform(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, Distribution::Uniform { min, max })
    }

    pub fn normal(name: impl Into<String>, mean: f64, std: f64) -> Self {
        Self::new(name, Distribution::Normal { mean, std })
    }

    pub fn log_normal(name: impl Into<String>, mu: f64, sigma: f64) -> Self {
        Self::new(name, Distribution::LogNormal { mu, sigma })
    }

    pub fn triangular(name: impl Into<String>, min: f64, mode: f64, max: f64) -> Self {
        Self::new(name, Distribution::Triangular { min, mode, max })
    }

    pub fn integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(name, Distribution::Integer { min, max })
    }

    pub fn point(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Distribution::Point { value })
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(RdmError::InvalidSpec(format!(
                "uncertainty {}: {reason}",
                self.name
            )))
        };

        match self.distribution {
            Distribution::Uniform { min, max } => {
                if !(min.is_finite() && max.is_finite()) || min > max {
                    return invalid("uniform range must be finite with min <= max");
                }
            }
            Distribution::Normal { mean, std } => {
                if !mean.is_finite() || !(std.is_finite() && std > 0.0) {
                    return invalid("normal needs finite mean and positive std");
                }
            }
            Distribution::LogNormal { mu, sigma } => {
                if !mu.is_finite() || !(sigma.is_finite() && sigma > 0.0) {
                    return invalid("log-normal needs finite mu and positive sigma");
                }
            }
            Distribution::Triangular { min, mode, max } => {
                if !(min.is_finite() && mode.is_finite() && max.is_finite())
                    || !(min <= mode && mode <= max)
                    || min == max
                {
                    return invalid("triangular needs min <= mode <= max and min < max");
                }
            }
            Distribution::Integer { min, max } => {
                if min > max {
                    return invalid("integer range needs min <= max");
                }
            }
            Distribution::Point { value } => {
                if !value.is_finite() {
                    return invalid("point value must be finite");
                }
            }
        }
        Ok(())
    }

    /// Inverse CDF at `u`; `u` is clamped to `[0, 1]`
    ///
    /// Returns NaN for parameters `validate` rejects.
    pub fn ppf(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        match self.distribution {
            Distribution::Uniform { min, max } => min + u * (max - min),
            Distribution::Normal { mean, std } => match Normal::new(mean, std) {
                Ok(dist) => dist.inverse_cdf(open_unit(u)),
                Err(_) => f64::NAN,
            },
            Distribution::LogNormal { mu, sigma } => match LogNormal::new(mu, sigma) {
                Ok(dist) => dist.inverse_cdf(open_unit(u)),
                Err(_) => f64::NAN,
            },
            Distribution::Triangular { min, mode, max } => match Triangular::new(min, max, mode) {
                Ok(dist) => dist.inverse_cdf(u),
                Err(_) => f64::NAN,
            },
            Distribution::Integer { min, max } => {
                let span = (max - min + 1) as f64;
                let offset = (u * span).floor() as i64;
                (min + offset).min(max) as f64
            }
            Distribution::Point { value } => value,
        }
    }

    /// Independent random draw
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.ppf(rng.r#gen::<f64>())
    }

    /// Effective `(lower, upper)` range; unbounded distributions use the
    /// 0.1% and 99.9% quantiles
    pub fn bounds(&self) -> (f64, f64) {
        match self.distribution {
            Distribution::Uniform { min, max } => (min, max),
            Distribution::Triangular { min, max, .. } => (min, max),
            Distribution::Integer { min, max } => (min as f64, max as f64),
            Distribution::Point { value } => (value, value),
            Distribution::Normal { .. } | Distribution::LogNormal { .. } => {
                (self.ppf(TAIL_QUANTILE), self.ppf(1.0 - TAIL_QUANTILE))
            }
        }
    }
}

/// Unbounded tails are cut at `UNIT_EPSILON`
fn open_unit(u: f64) -> f64 {
    u.clamp(UNIT_EPSILON, 1.0 - UNIT_EPSILON)
}
