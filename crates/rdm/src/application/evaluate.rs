//! Evaluating a model over an ensemble of states of the world

use crate::domain::{DataSet, Model, Record};
use crate::error::{RdmError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::time::Instant;

/// Independent RNG for SOW `index`
///
/// Seeds are derived with SplitMix64 so neighbouring indices give
/// uncorrelated streams.
pub fn sow_rng(seed: u64, index: usize) -> StdRng {
    let mut z = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    StdRng::seed_from_u64(z ^ (z >> 31))
}

/// Evaluate every SOW in parallel
///
/// Output rows are the inputs followed by the model's responses, in input
/// order. Results do not depend on thread scheduling.
pub fn evaluate<M: Model>(model: &M, inputs: &DataSet, seed: u64) -> Result<DataSet> {
    run(model, inputs, seed, false)
}

/// Same as [`evaluate`] on the calling thread
pub fn evaluate_sequential<M: Model>(model: &M, inputs: &DataSet, seed: u64) -> Result<DataSet> {
    run(model, inputs, seed, true)
}

fn run<M: Model>(model: &M, inputs: &DataSet, seed: u64, force_sequential: bool) -> Result<DataSet> {
    let started = Instant::now();
    let defaults = model.spec().defaults();

    let evaluate_one = |index: usize, sow: &Record| -> std::result::Result<Record, M::Error> {
        let mut full = defaults.clone();
        for (k, v) in sow {
            full.insert(k.clone(), *v);
        }

        let mut rng = sow_rng(seed, index);
        let responses = model.evaluate(&full, &mut rng)?;

        let mut row = sow.clone();
        row.extend(responses);
        Ok(row)
    };

    let results: Vec<std::result::Result<Record, M::Error>> = if force_sequential {
        inputs
            .iter()
            .enumerate()
            .map(|(i, sow)| evaluate_one(i, sow))
            .collect()
    } else {
        inputs
            .rows()
            .par_iter()
            .enumerate()
            .map(|(i, sow)| evaluate_one(i, sow))
            .collect()
    };

    let mut rows = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!(index, error = %e, "model evaluation failed");
                return Err(RdmError::Evaluation {
                    index,
                    source: Box::new(e),
                });
            }
        }
    }

    tracing::debug!(
        sows = rows.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        parallel = !force_sequential,
        "evaluated ensemble"
    );
    Ok(DataSet::from_rows(rows))
}
