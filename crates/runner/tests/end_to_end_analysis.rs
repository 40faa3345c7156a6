//! End-to-end runs of the BECCS analysis on small ensembles
//!
//! These exercise every stage and every output file. Sample sizes are kept
//! small; the statistical behaviour of each stage is tested in its crate.

use beccs_runner::config::{CartSettings, SobolSettings};
use beccs_runner::report::{CART_RESULTS_FILE, PROCESSED_RESULTS_FILE, RAW_RESULTS_FILE, SOBOL_RESULTS_FILE};
use beccs_runner::{Analysis, AnalysisConfig, PriceTrend, summary, write_outputs};

const SAMPLE_SIZE: usize = 400;

fn config(dir: &std::path::Path) -> AnalysisConfig {
    AnalysisConfig {
        sample_size: SAMPLE_SIZE,
        seed: 11,
        cart: CartSettings {
            min_samples_leaf: 20,
            ..Default::default()
        },
        sobol: SobolSettings {
            samples: 32,
            ..Default::default()
        },
        output_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn test_full_run_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let analysis = Analysis::new(config(dir.path())).unwrap();
    let results = analysis.run().unwrap();

    assert_eq!(results.results.len(), SAMPLE_SIZE);
    assert!(results.scenarios.is_some());
    assert!(results.sensitivity.is_some());

    let written = write_outputs(&results, dir.path()).unwrap();
    assert_eq!(written.len(), 4);
    for name in [RAW_RESULTS_FILE, CART_RESULTS_FILE, SOBOL_RESULTS_FILE, PROCESSED_RESULTS_FILE] {
        assert!(dir.path().join(name).exists(), "{name} missing");
    }

    let raw = beccs_rdm::load_csv(dir.path().join(RAW_RESULTS_FILE)).unwrap();
    assert_eq!(raw.len(), SAMPLE_SIZE);
    assert!(raw.column("Regret").unwrap().iter().all(|&r| r >= 0.0));

    let sobol = std::fs::read_to_string(dir.path().join(SOBOL_RESULTS_FILE)).unwrap();
    // Header plus one line per uncertainty
    assert_eq!(sobol.lines().count(), 1 + 17);
    assert!(sobol.starts_with("Uncertainty,S1,S1 (confidence interval),ST,ST (confidence interval)"));

    let cart = std::fs::read_to_string(dir.path().join(CART_RESULTS_FILE)).unwrap();
    assert!(cart.starts_with("Node nr,Class,Density,Coverage,Rule(s)"));
}

#[test]
fn test_processed_results_json() {
    let dir = tempfile::tempdir().unwrap();
    let results = Analysis::new(config(dir.path())).unwrap().run().unwrap();
    write_outputs(&results, dir.path()).unwrap();

    let text = std::fs::read_to_string(dir.path().join(PROCESSED_RESULTS_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(json["run_id"], results.run_id.to_string());
    assert_eq!(json["config"]["sample_size"], SAMPLE_SIZE);
    assert_eq!(json["robustness"]["sows"], SAMPLE_SIZE);
    assert!(json.get("results").is_none());

    let groups: Vec<&str> = json["sensitivity"]["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["group"].as_str().unwrap())
        .collect();
    assert_eq!(groups, vec!["Commodity prices", "BECCS valuations", "Policy states"]);
}

#[test]
fn test_scenarios_are_regret_free_regions() {
    let dir = tempfile::tempdir().unwrap();
    let results = Analysis::new(config(dir.path())).unwrap().run().unwrap();
    let scenarios = results.scenarios.as_ref().unwrap();

    assert_eq!(scenarios.reliable + scenarios.unreliable, SAMPLE_SIZE);
    assert_eq!(scenarios.reliable, results.results.count("Regret == 0").unwrap());

    let coverage: f64 = scenarios.scenarios.iter().map(|s| s.coverage).sum();
    assert!(coverage <= 1.0 + 1e-9);
    for node in &scenarios.scenarios {
        assert_eq!(node.class, "Reliable");
        assert!(node.density >= 0.5);
        assert!(node.samples >= 20);
    }
}

#[test]
fn test_disabled_stages_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.cart.enabled = false;
    config.sobol.enabled = false;
    config.price_trend = PriceTrend::Rising;

    let results = Analysis::new(config).unwrap().run().unwrap();
    assert!(results.scenarios.is_none());
    assert!(results.sensitivity.is_none());

    let written = write_outputs(&results, dir.path()).unwrap();
    assert_eq!(written.len(), 2);
    assert!(!dir.path().join(CART_RESULTS_FILE).exists());

    let text = summary(&results);
    assert!(text.contains("Investing is satisficing in"));
    assert!(text.contains("price trend rising"));
}

#[test]
fn test_runs_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.sobol.enabled = false;

    let a = Analysis::new(config.clone()).unwrap().run().unwrap();
    let b = Analysis::new(config).unwrap().run().unwrap();
    assert_eq!(a.results, b.results);
    assert_eq!(a.robustness, b.robustness);
    assert_eq!(a.scenarios, b.scenarios);
    assert_ne!(a.run_id, b.run_id);
}
