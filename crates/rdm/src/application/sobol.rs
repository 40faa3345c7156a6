//! Variance-based global sensitivity analysis
//!
//! Saltelli's cross-sampling scheme over the uncertainty bounds. First-order
//! indices use the Saltelli (2010) estimator, total-order indices the Jansen
//! estimator and second-order indices Saltelli (2002). Confidence intervals
//! come from bootstrap resampling of the base samples.

use super::evaluate::evaluate;
use super::sampling::update;
use crate::domain::{DataSet, Model, ModelSpec, Record};
use crate::error::{RdmError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SobolConfig {
    /// Base sample count `N`
    pub samples: usize,
    pub second_order: bool,
    pub bootstrap_resamples: usize,
    /// Confidence level of the reported intervals
    pub confidence: f64,
    pub seed: u64,
}

impl Default for SobolConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            second_order: false,
            bootstrap_resamples: 100,
            confidence: 0.95,
            seed: 7,
        }
    }
}

impl SobolConfig {
    /// Model runs needed for `dimensions` uncertainties
    pub fn evaluations(&self, dimensions: usize) -> usize {
        self.samples * self.step(dimensions)
    }

    fn step(&self, dimensions: usize) -> usize {
        if self.second_order {
            2 * dimensions + 2
        } else {
            dimensions + 2
        }
    }
}

/// Indices of one uncertainty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SobolIndices {
    pub name: String,
    pub s1: f64,
    pub s1_conf: f64,
    pub st: f64,
    pub st_conf: f64,
}

/// Summed indices of a named group of uncertainties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupIndices {
    pub group: String,
    pub s1: f64,
    pub st: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SobolResult {
    pub response: String,
    /// In uncertainty order
    pub indices: Vec<SobolIndices>,
    /// `s2[j][k]` for `j < k`, NaN elsewhere
    pub s2: Option<Vec<Vec<f64>>>,
    pub s2_conf: Option<Vec<Vec<f64>>>,
    /// Variance of the response over all evaluated rows
    pub variance: f64,
    pub evaluations: usize,
}

impl SobolResult {
    pub fn get(&self, name: &str) -> Option<&SobolIndices> {
        self.indices.iter().find(|i| i.name == name)
    }

    /// Indices sorted by descending total order
    pub fn ranked_by_total(&self) -> Vec<&SobolIndices> {
        let mut ranked: Vec<&SobolIndices> = self.indices.iter().collect();
        ranked.sort_by(|a, b| b.st.total_cmp(&a.st));
        ranked
    }

    /// Sum S1 and ST over each group of uncertainty names
    pub fn grouped(&self, groups: &[(&str, &[&str])]) -> Result<Vec<GroupIndices>> {
        groups
            .iter()
            .map(|(group, members)| {
                let mut s1 = 0.0;
                let mut st = 0.0;
                for name in *members {
                    let indices = self
                        .get(name)
                        .ok_or_else(|| RdmError::UnknownColumn(name.to_string()))?;
                    s1 += indices.s1;
                    st += indices.st;
                }
                Ok(GroupIndices {
                    group: group.to_string(),
                    s1,
                    st,
                })
            })
            .collect()
    }
}

/// Saltelli cross-sample of the uncertainties
///
/// Rows come in blocks per base sample: `A`, `AB_1..AB_D`, then
/// `BA_1..BA_D` when second order is requested, then `B`.
pub fn saltelli_sample<R: Rng + ?Sized>(spec: &ModelSpec, config: &SobolConfig, rng: &mut R) -> DataSet {
    let d = spec.uncertainties.len();
    let bounds: Vec<(f64, f64)> = spec.uncertainties.iter().map(|u| u.bounds()).collect();
    let names: Vec<&str> = spec.uncertainties.iter().map(|u| u.name.as_str()).collect();

    let record = |values: &[f64]| -> Record {
        names
            .iter()
            .zip(values)
            .zip(&bounds)
            .map(|((name, u), (lo, hi))| (name.to_string(), lo + u * (hi - lo)))
            .collect()
    };

    let mut rows = Vec::with_capacity(config.evaluations(d));
    for _ in 0..config.samples {
        let a: Vec<f64> = (0..d).map(|_| rng.r#gen()).collect();
        let b: Vec<f64> = (0..d).map(|_| rng.r#gen()).collect();

        rows.push(record(&a));
        for i in 0..d {
            let mut ab = a.clone();
            ab[i] = b[i];
            rows.push(record(&ab));
        }
        if config.second_order {
            for i in 0..d {
                let mut ba = b.clone();
                ba[i] = a[i];
                rows.push(record(&ba));
            }
        }
        rows.push(record(&b));
    }

    DataSet::from_rows(rows)
}

/// Sample, evaluate under `policy` and analyze one response
pub fn sa<M: Model>(model: &M, response: &str, policy: &Record, config: &SobolConfig) -> Result<SobolResult> {
    let spec = model.spec();
    if spec.uncertainties.is_empty() {
        return Err(RdmError::Sensitivity("model has no uncertainties".to_string()));
    }
    if config.samples < 2 {
        return Err(RdmError::Sensitivity(format!(
            "need at least 2 base samples, got {}",
            config.samples
        )));
    }

    tracing::info!(
        response,
        samples = config.samples,
        evaluations = config.evaluations(spec.uncertainties.len()),
        "running Sobol sensitivity analysis"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let sows = update(saltelli_sample(spec, config, &mut rng), policy);
    let results = evaluate(model, &sows, config.seed)?;
    let y = results.column(response)?;

    analyze(&spec.uncertainty_names(), response, &y, config)
}

/// Indices from model outputs laid out as by [`saltelli_sample`]
pub fn analyze(names: &[String], response: &str, y: &[f64], config: &SobolConfig) -> Result<SobolResult> {
    let d = names.len();
    let n = config.samples;
    let step = config.step(d);
    if d == 0 || n == 0 || y.len() != n * step {
        return Err(RdmError::Sensitivity(format!(
            "expected {} outputs for {} uncertainties, got {}",
            n * step,
            d,
            y.len()
        )));
    }
    if !(config.confidence > 0.0 && config.confidence < 1.0) {
        return Err(RdmError::Sensitivity(format!(
            "confidence level must lie in (0, 1), got {}",
            config.confidence
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(RdmError::Sensitivity(format!("{response} has non-finite values")));
    }

    let variance = y.population_variance();
    if variance <= f64::EPSILON * y.iter().map(|v| v * v).mean() {
        return Err(RdmError::Sensitivity(format!(
            "{response} does not vary, indices are undefined"
        )));
    }

    // Standardize so the estimators are well conditioned
    let centre = y.mean();
    let sd = variance.sqrt();
    let y: Vec<f64> = y.iter().map(|v| (v - centre) / sd).collect();

    let blocks = Blocks::new(&y, d, step, config.second_order);
    let all: Vec<usize> = (0..n).collect();

    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let resamples: Vec<Vec<usize>> = (0..config.bootstrap_resamples)
        .map(|_| (0..n).map(|_| rng.gen_range(0..n)).collect())
        .collect();
    let z = z_score(config.confidence);

    let indices = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let s1_boot: Vec<f64> = resamples.iter().map(|r| blocks.first_order(i, r)).collect();
            let st_boot: Vec<f64> = resamples.iter().map(|r| blocks.total_order(i, r)).collect();
            SobolIndices {
                name: name.clone(),
                s1: blocks.first_order(i, &all),
                s1_conf: z * sample_std(&s1_boot),
                st: blocks.total_order(i, &all),
                st_conf: z * sample_std(&st_boot),
            }
        })
        .collect();

    let (s2, s2_conf) = if config.second_order {
        let mut s2 = vec![vec![f64::NAN; d]; d];
        let mut s2_conf = vec![vec![f64::NAN; d]; d];
        for j in 0..d {
            for k in j + 1..d {
                s2[j][k] = blocks.second_order(j, k, &all);
                let boot: Vec<f64> = resamples
                    .iter()
                    .map(|r| blocks.second_order(j, k, r))
                    .collect();
                s2_conf[j][k] = z * sample_std(&boot);
            }
        }
        (Some(s2), Some(s2_conf))
    } else {
        (None, None)
    };

    Ok(SobolResult {
        response: response.to_string(),
        indices,
        s2,
        s2_conf,
        variance,
        evaluations: n * step,
    })
}

/// Outputs split into the A, B, AB and BA matrices
struct Blocks {
    a: Vec<f64>,
    b: Vec<f64>,
    ab: Vec<Vec<f64>>,
    ba: Vec<Vec<f64>>,
}

impl Blocks {
    fn new(y: &[f64], d: usize, step: usize, second_order: bool) -> Self {
        let mut blocks = Self {
            a: Vec::new(),
            b: Vec::new(),
            ab: vec![Vec::new(); d],
            ba: vec![Vec::new(); if second_order { d } else { 0 }],
        };
        for chunk in y.chunks_exact(step) {
            blocks.a.push(chunk[0]);
            for i in 0..d {
                blocks.ab[i].push(chunk[1 + i]);
                if second_order {
                    blocks.ba[i].push(chunk[1 + d + i]);
                }
            }
            blocks.b.push(chunk[step - 1]);
        }
        blocks
    }

    fn variance(&self, rows: &[usize]) -> f64 {
        let values: Vec<f64> = rows
            .iter()
            .map(|&r| self.a[r])
            .chain(rows.iter().map(|&r| self.b[r]))
            .collect();
        values.population_variance()
    }

    fn first_order(&self, i: usize, rows: &[usize]) -> f64 {
        let var = self.variance(rows);
        if var == 0.0 {
            return 0.0;
        }
        rows.iter().map(|&r| self.b[r] * (self.ab[i][r] - self.a[r])).mean() / var
    }

    fn total_order(&self, i: usize, rows: &[usize]) -> f64 {
        let var = self.variance(rows);
        if var == 0.0 {
            return 0.0;
        }
        0.5 * rows.iter().map(|&r| (self.a[r] - self.ab[i][r]).powi(2)).mean() / var
    }

    fn second_order(&self, j: usize, k: usize, rows: &[usize]) -> f64 {
        let var = self.variance(rows);
        if var == 0.0 {
            return 0.0;
        }
        let closed = rows.iter().map(|&r| self.ba[j][r] * self.ab[k][r] - self.a[r] * self.b[r]).mean() / var;
        closed - self.first_order(j, rows) - self.first_order(k, rows)
    }
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.std_dev()
}

/// Two-sided standard normal quantile for a confidence level in `(0, 1)`
fn z_score(confidence: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(0.5 + confidence / 2.0),
        Err(_) => f64::NAN,
    }
}
