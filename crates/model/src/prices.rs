//! Stochastic price trajectories
//!
//! Each commodity price follows a bounded random walk over the horizon. Every
//! annual step is a Beta draw scaled onto `[max_decrease, max_increase]`; the
//! trend parameter (`*_dt`, nominally in `[-1, 1]`) skews the Beta shape so
//! that a high trend makes increases more likely and a low trend decreases.
//! Near the floor or roof the step range is squeezed so the price bounces
//! back instead of crossing the bound.
//!
//! The ETS allowance price instead grows exponentially with a uniform
//! disturbance on top.

use crate::error::{ModelError, Result};
use crate::plant::HORIZON_YEARS;
use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// One value per modelled year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    values: Vec<f64>,
}

impl Trajectory {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean, 0 for an empty trajectory
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Value in the last modelled year
    pub fn final_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

impl Index<usize> for Trajectory {
    type Output = f64;

    fn index(&self, t: usize) -> &f64 {
        &self.values[t]
    }
}

impl From<Vec<f64>> for Trajectory {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// How a trend parameter is translated into Beta shape parameters
///
/// The trend is mapped linearly so that `-1` gives `(lo, hi)` and `+1` gives
/// `(hi, lo)`. The scales then sharpen one side of the distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendShape {
    pub lo: f64,
    pub hi: f64,
    pub alpha_scale: f64,
    pub beta_scale: f64,
}

impl TrendShape {
    /// Electricity and heat: wide response to the trend
    pub const ENERGY: Self = Self {
        lo: 0.3,
        hi: 1.7,
        alpha_scale: 1.0,
        beta_scale: 1.0,
    };

    /// Voluntary carbon market: milder response, biased towards increases
    pub const NEGATIVE_EMISSION: Self = Self {
        lo: 0.6,
        hi: 1.4,
        alpha_scale: 1.4,
        beta_scale: 1.0,
    };

    /// Beta `(alpha, beta)` for a trend value
    pub fn beta_params(&self, trend: f64) -> (f64, f64) {
        let x = trend + 1.0;
        let alpha = (self.hi - self.lo) / 2.0 * x + self.lo;
        let beta = (self.lo - self.hi) / 2.0 * x + self.hi;
        (alpha * self.alpha_scale, beta * self.beta_scale)
    }

    fn distribution(&self, name: &str, trend: f64) -> Result<Beta<f64>> {
        let (alpha, beta) = self.beta_params(trend);
        if !(alpha.is_finite() && beta.is_finite() && alpha > 0.0 && beta > 0.0) {
            return Err(ModelError::invalid(
                name,
                trend,
                format!("trend maps to Beta({alpha:.3}, {beta:.3})"),
            ));
        }
        Beta::new(alpha, beta).map_err(|e| ModelError::Distribution(e.to_string()))
    }
}

/// Bounded Beta random walk for one commodity price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedWalk {
    /// Trend parameter name, for error messages
    pub name: &'static str,
    pub floor: f64,
    pub roof: f64,
    /// Largest single-year increase (positive)
    pub max_increase: f64,
    /// Largest single-year decrease (negative)
    pub max_decrease: f64,
    pub shape: TrendShape,
}

impl BoundedWalk {
    pub const ELECTRICITY: Self = Self {
        name: "pelectricity_dt",
        floor: 5.0,
        roof: 200.0,
        max_increase: 40.0,
        max_decrease: -40.0,
        shape: TrendShape::ENERGY,
    };

    pub const HEAT: Self = Self {
        name: "pheat_dt",
        floor: 48.0,
        roof: 200.0,
        max_increase: 10.0,
        max_decrease: -10.0,
        shape: TrendShape::ENERGY,
    };

    pub const NEGATIVE_EMISSION: Self = Self {
        name: "pNE_dt",
        floor: 3.0,
        roof: 500.0,
        max_increase: 40.0,
        max_decrease: -40.0,
        shape: TrendShape::NEGATIVE_EMISSION,
    };

    /// Price change for one year given a draw `v` in `[0, 1]`
    pub fn step(&self, price: f64, v: f64) -> f64 {
        if price + self.max_increase > self.roof {
            self.max_decrease + ((self.roof - price) - self.max_decrease) * v
        } else if price + self.max_decrease < self.floor {
            let to_floor = -(price - self.floor);
            to_floor + (self.max_increase - to_floor) * v
        } else {
            self.max_decrease + (self.max_increase - self.max_decrease) * v
        }
    }

    /// Generate a full trajectory starting at `start`
    pub fn generate<R: Rng + ?Sized>(&self, start: f64, trend: f64, rng: &mut R) -> Result<Trajectory> {
        let beta = self.shape.distribution(self.name, trend)?;

        let mut price = start;
        let mut values = Vec::with_capacity(HORIZON_YEARS);
        for _ in 0..HORIZON_YEARS {
            values.push(price);
            price += self.step(price, beta.sample(rng));
        }

        Ok(Trajectory::new(values))
    }
}

/// Exponential ETS allowance price with a uniform yearly disturbance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtsPath {
    /// Base annual growth, scaled by the trend strength
    pub growth: f64,
    /// Trend strength at `pETS_dt = -1`
    pub strength_lo: f64,
    /// Trend strength at `pETS_dt = +1`
    pub strength_hi: f64,
    pub max_increase: f64,
    pub max_decrease: f64,
}

impl Default for EtsPath {
    fn default() -> Self {
        Self {
            growth: 0.06,
            strength_lo: 0.6,
            strength_hi: 1.5,
            max_increase: 40.0,
            max_decrease: -40.0,
        }
    }
}

impl EtsPath {
    /// Annual growth factor for a trend value
    pub fn growth_factor(&self, trend: f64) -> f64 {
        let strength =
            (self.strength_hi - self.strength_lo) / 2.0 * (trend + 1.0) + self.strength_lo;
        1.0 + self.growth * strength
    }

    pub fn generate<R: Rng + ?Sized>(&self, start: f64, trend: f64, rng: &mut R) -> Result<Trajectory> {
        if !trend.is_finite() {
            return Err(ModelError::invalid("pETS_dt", trend, "trend must be finite"));
        }
        let factor = self.growth_factor(trend);
        let uniform = Beta::new(1.0, 1.0).map_err(|e| ModelError::Distribution(e.to_string()))?;

        let mut values = Vec::with_capacity(HORIZON_YEARS);
        values.push(start);
        for t in 1..HORIZON_YEARS {
            let v: f64 = uniform.sample(rng);
            let disturbance = self.max_decrease + (self.max_increase - self.max_decrease) * v;
            values.push(start * factor.powi(t as i32) + disturbance);
        }

        Ok(Trajectory::new(values))
    }
}

/// The four price trajectories of one state of the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceScenario {
    pub electricity: Trajectory,
    pub heat: Trajectory,
    pub negative_emission: Trajectory,
    pub ets: Trajectory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_beta_params_endpoints() {
        let (a, b) = TrendShape::ENERGY.beta_params(-1.0);
        assert_relative_eq!(a, 0.3);
        assert_relative_eq!(b, 1.7);

        let (a, b) = TrendShape::ENERGY.beta_params(1.0);
        assert_relative_eq!(a, 1.7);
        assert_relative_eq!(b, 0.3);

        // NE alpha is sharpened by 1.4
        let (a, b) = TrendShape::NEGATIVE_EMISSION.beta_params(0.0);
        assert_relative_eq!(a, 1.4);
        assert_relative_eq!(b, 1.0);
    }

    #[test]
    fn test_step_unconstrained_range() {
        let walk = BoundedWalk::ELECTRICITY;
        assert_relative_eq!(walk.step(100.0, 0.0), -40.0);
        assert_relative_eq!(walk.step(100.0, 1.0), 40.0);
        assert_relative_eq!(walk.step(100.0, 0.5), 0.0);
    }

    #[test]
    fn test_step_near_roof_cannot_cross() {
        let walk = BoundedWalk::ELECTRICITY;
        // 190 + 40 > 200: the largest step lands exactly on the roof
        assert_relative_eq!(walk.step(190.0, 1.0), 10.0);
        assert_relative_eq!(walk.step(190.0, 0.0), -40.0);
    }

    #[test]
    fn test_step_near_floor_cannot_cross() {
        let walk = BoundedWalk::ELECTRICITY;
        // 20 - 40 < 5: the smallest step lands exactly on the floor
        assert_relative_eq!(walk.step(20.0, 0.0), -15.0);
        assert_relative_eq!(walk.step(20.0, 1.0), 40.0);
    }

    #[test]
    fn test_generate_length_and_start() {
        let mut rng = StdRng::seed_from_u64(42);
        let path = BoundedWalk::HEAT.generate(50.0, -0.5, &mut rng).unwrap();
        assert_eq!(path.len(), HORIZON_YEARS);
        assert_relative_eq!(path[0], 50.0);
    }

    #[test]
    fn test_generate_rejects_extreme_trend() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = BoundedWalk::ELECTRICITY
            .generate(50.0, 5.0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { ref name, .. } if name == "pelectricity_dt"));
    }

    #[test]
    fn test_ets_growth_factor() {
        let ets = EtsPath::default();
        assert_relative_eq!(ets.growth_factor(-1.0), 1.036);
        assert_relative_eq!(ets.growth_factor(1.0), 1.09);
    }

    #[test]
    fn test_ets_path_disturbance_bounds() {
        let ets = EtsPath::default();
        let mut rng = StdRng::seed_from_u64(7);
        let path = ets.generate(80.0, 0.0, &mut rng).unwrap();
        let factor = ets.growth_factor(0.0);

        assert_relative_eq!(path[0], 80.0);
        for t in 1..HORIZON_YEARS {
            let trend = 80.0 * factor.powi(t as i32);
            assert!((path[t] - trend).abs() <= 40.0 + 1e-9);
        }
    }

    #[test]
    fn test_trajectory_mean() {
        let path = Trajectory::new(vec![1.0, 2.0, 3.0]);
        assert_relative_eq!(path.mean(), 2.0);
        assert_eq!(path.final_value(), Some(3.0));
        assert_relative_eq!(Trajectory::new(Vec::new()).mean(), 0.0);
    }
}
