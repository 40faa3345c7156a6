//! Robustness metrics over an evaluated ensemble

use crate::domain::{DataSet, Direction};
use crate::error::{RdmError, Result};
use serde::{Deserialize, Serialize};

/// Rows satisfying a performance criterion, e.g. `"NPV_invest > 0"`
pub fn satisficing_count(results: &DataSet, criterion: &str) -> Result<usize> {
    results.count(criterion)
}

/// Share of rows satisfying a criterion, 0 for an empty data set
pub fn satisficing_share(results: &DataSet, criterion: &str) -> Result<f64> {
    if results.is_empty() {
        return Ok(0.0);
    }
    Ok(satisficing_count(results, criterion)? as f64 / results.len() as f64)
}

/// Regret of one alternative across the ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegretSummary {
    /// Column holding the alternative's performance
    pub alternative: String,
    /// Savage criterion: worst-case regret
    pub max_regret: f64,
    pub mean_regret: f64,
    /// SOWs in which this alternative is (one of) the best
    pub zero_regret_count: usize,
}

/// Per-row regret of each alternative against the best alternative in that row
///
/// `alternatives` name columns holding comparable performance values;
/// `direction` says whether higher or lower is better.
pub fn regret_summary(
    results: &DataSet,
    alternatives: &[&str],
    direction: Direction,
) -> Result<Vec<RegretSummary>> {
    if alternatives.is_empty() {
        return Err(RdmError::InvalidInput("no alternatives to compare".to_string()));
    }
    if direction == Direction::Info {
        return Err(RdmError::InvalidInput(
            "regret needs a minimize or maximize direction".to_string(),
        ));
    }

    let columns = alternatives
        .iter()
        .map(|name| results.column(name))
        .collect::<Result<Vec<_>>>()?;

    let mut max_regret = vec![0.0f64; alternatives.len()];
    let mut sum_regret = vec![0.0f64; alternatives.len()];
    let mut zero_regret = vec![0usize; alternatives.len()];

    for row in 0..results.len() {
        let values = columns.iter().map(|c| c[row]);
        let best = match direction {
            Direction::Maximize => values.fold(f64::NEG_INFINITY, f64::max),
            _ => values.fold(f64::INFINITY, f64::min),
        };
        for (j, column) in columns.iter().enumerate() {
            let regret = match direction {
                Direction::Maximize => best - column[row],
                _ => column[row] - best,
            };
            max_regret[j] = max_regret[j].max(regret);
            sum_regret[j] += regret;
            if regret == 0.0 {
                zero_regret[j] += 1;
            }
        }
    }

    let n = results.len().max(1) as f64;
    Ok(alternatives
        .iter()
        .enumerate()
        .map(|(j, name)| RegretSummary {
            alternative: name.to_string(),
            max_regret: max_regret[j],
            mean_regret: sum_regret[j] / n,
            zero_regret_count: zero_regret[j],
        })
        .collect())
}

/// Alternative with the smallest worst-case regret
pub fn min_max_regret(summaries: &[RegretSummary]) -> Option<&RegretSummary> {
    summaries
        .iter()
        .min_by(|a, b| a.max_regret.total_cmp(&b.max_regret))
}
