//! Sampling states of the world

use crate::domain::{DataSet, ModelSpec, Record};
use rand::Rng;
use rand::seq::SliceRandom;

/// Latin hypercube sample of the uncertainties
///
/// Each uncertainty's unit interval is cut into `n` equal strata; every
/// stratum receives exactly one draw, and strata are paired across
/// uncertainties by independent shuffles.
pub fn sample_lhs<R: Rng + ?Sized>(spec: &ModelSpec, n: usize, rng: &mut R) -> DataSet {
    let mut rows: Vec<Record> = (0..n)
        .map(|_| Record::with_capacity(spec.uncertainties.len()))
        .collect();

    let width = 1.0 / n.max(1) as f64;
    let mut strata: Vec<usize> = (0..n).collect();
    for uncertainty in &spec.uncertainties {
        strata.shuffle(rng);
        for (row, &stratum) in rows.iter_mut().zip(&strata) {
            let u = (stratum as f64 + rng.r#gen::<f64>()) * width;
            row.insert(uncertainty.name.clone(), uncertainty.ppf(u));
        }
    }

    DataSet::from_rows(rows)
}

/// Independent Monte Carlo sample of the uncertainties
pub fn sample_uniform<R: Rng + ?Sized>(spec: &ModelSpec, n: usize, rng: &mut R) -> DataSet {
    (0..n)
        .map(|_| {
            spec.uncertainties
                .iter()
                .map(|u| (u.name.clone(), u.sample(rng)))
                .collect::<Record>()
        })
        .collect()
}

/// Overlay a policy (lever settings) on every SOW
pub fn update(mut sows: DataSet, policy: &Record) -> DataSet {
    sows.update(policy);
    sows
}
