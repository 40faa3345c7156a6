//! Statistical validation of the price generators and the investment model
//!
//! These tests draw many trajectories and check the aggregate behaviour the
//! trend parameters are meant to produce.

use beccs_model::{
    BeccsInvestment, BoundedWalk, Decision, EtsPath, HORIZON_YEARS, InvestmentInputs,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

const N_PATHS: usize = 2000;
const SEED: u64 = 42;

/// Mean final value over many trajectories
fn mean_final(walk: &BoundedWalk, start: f64, trend: f64, seed: u64) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let total: f64 = (0..N_PATHS)
        .map(|_| {
            walk.generate(start, trend, &mut rng)
                .unwrap()
                .final_value()
                .unwrap()
        })
        .sum();
    total / N_PATHS as f64
}

#[test]
fn test_trend_direction_electricity() {
    let walk = BoundedWalk::ELECTRICITY;
    let rising = mean_final(&walk, 50.0, 1.0, SEED);
    let falling = mean_final(&walk, 50.0, -1.0, SEED);

    println!("Electricity 2050 mean: rising={rising:.1}, falling={falling:.1}");
    assert!(rising > 100.0, "rising trend should end well above start, got {rising:.1}");
    assert!(falling < 30.0, "falling trend should end below start, got {falling:.1}");
}

#[test]
fn test_trend_direction_negative_emission() {
    let walk = BoundedWalk::NEGATIVE_EMISSION;
    let rising = mean_final(&walk, 80.0, 1.0, SEED);
    let flat = mean_final(&walk, 80.0, 0.0, SEED);
    let falling = mean_final(&walk, 80.0, -1.0, SEED);

    println!("NE 2050 mean: rising={rising:.1}, flat={flat:.1}, falling={falling:.1}");
    assert!(rising > flat);
    assert!(flat > falling);
}

#[test]
fn test_heat_stays_within_bounds() {
    let walk = BoundedWalk::HEAT;
    let mut rng = StdRng::seed_from_u64(SEED);

    for trend in [-1.0, -0.5, 0.0, 0.7, 1.0] {
        for _ in 0..200 {
            let path = walk.generate(50.0, trend, &mut rng).unwrap();
            for &p in path.iter() {
                assert!(
                    (walk.floor - 1e-9..=walk.roof + 1e-9).contains(&p),
                    "heat price {p} escaped [{}, {}]",
                    walk.floor,
                    walk.roof
                );
            }
        }
    }
}

#[test]
fn test_ets_trend_increases_growth() {
    let ets = EtsPath::default();
    let mut rng = StdRng::seed_from_u64(SEED);

    let final_mean = |trend: f64, rng: &mut StdRng| -> f64 {
        (0..N_PATHS)
            .map(|_| ets.generate(80.0, trend, rng).unwrap()[HORIZON_YEARS - 1])
            .sum::<f64>()
            / N_PATHS as f64
    };

    let strong = final_mean(1.0, &mut rng);
    let weak = final_mean(-1.0, &mut rng);
    assert!(strong > weak * 1.5, "strong={strong:.1}, weak={weak:.1}");
}

#[test]
fn test_expensive_capture_favours_waiting() {
    let model = BeccsInvestment::default();
    let mut rng = StdRng::seed_from_u64(SEED);

    let mut inputs = InvestmentInputs::default();
    inputs.costs.capex = 300e6;
    inputs.market.ne_2024 = 5.0;
    inputs.market.ne_trend = -1.0;
    inputs.policy.auction = 0.0;
    inputs.policy.quota_year = 2100.0;
    inputs.policy.eu_integration_year = 2100.0;
    inputs.policy.claim_year = 2050.0;

    for _ in 0..50 {
        let outcome = model.evaluate(&inputs, &mut rng).unwrap();
        assert!(outcome.npv_wait > outcome.npv_invest);
        assert!(outcome.regret > 0.0);
        assert_eq!(outcome.regret_of(Decision::Wait), 0.0);
    }
}

proptest! {
    #[test]
    fn prop_walk_respects_bounds(
        start in 5.0f64..200.0,
        trend in -1.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let walk = BoundedWalk::ELECTRICITY;
        let mut rng = StdRng::seed_from_u64(seed);
        let path = walk.generate(start, trend, &mut rng).unwrap();

        prop_assert_eq!(path.len(), HORIZON_YEARS);
        prop_assert_eq!(path[0], start);
        for &p in path.iter() {
            prop_assert!(p >= walk.floor - 1e-9 && p <= walk.roof + 1e-9);
        }
    }

    #[test]
    fn prop_regret_non_negative(
        capex in 100e6f64..300e6,
        ne_2024 in 20.0f64..140.0,
        claim_year in 2023.0f64..2050.0,
        invest in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let model = BeccsInvestment::default();
        let mut inputs = InvestmentInputs::default();
        inputs.decision = if invest { Decision::Invest } else { Decision::Wait };
        inputs.costs.capex = capex;
        inputs.market.ne_2024 = ne_2024;
        inputs.policy.claim_year = claim_year;

        let outcome = model.evaluate(&inputs, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert!(outcome.regret >= 0.0);
        prop_assert!(
            outcome.regret_of(Decision::Invest) == 0.0 || outcome.regret_of(Decision::Wait) == 0.0
        );
    }
}
