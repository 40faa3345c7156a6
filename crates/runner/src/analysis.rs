//! Analysis - sampling, evaluation and robustness analyses
//!
//! Runs the stages of one robust decision-making analysis of the BECCS
//! investment:
//! - Latin hypercube sample of the uncertainties with the policy applied
//! - Parallel evaluation of every state of the world
//! - Robustness metrics (satisficing and Savage regret)
//! - Scenario discovery for regret-free SOWs with CART
//! - Sobol sensitivity of a response (regret by default)

use crate::beccs::{BeccsModel, INVESTMENT_DECISION, NPV_INVEST, NPV_WAIT, REGRET, SENSITIVITY_GROUPS};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use beccs_rdm::{
    Cart, CartConfig, DataSet, Direction, GroupIndices, Model, RdmError, Record, RegretSummary,
    ScenarioNode, SobolConfig, SobolResult, application::sobol, evaluate, regret_summary, sample_lhs,
    update,
};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

pub const RELIABLE: &str = "Reliable";
pub const UNRELIABLE: &str = "Unreliable";

/// Satisficing and regret across the ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub sows: usize,
    /// SOWs with `NPV_invest > 0`
    pub invest_satisficing: usize,
    /// SOWs with `NPV_wait > 0`
    pub wait_satisficing: usize,
    /// Satisficing and better than waiting
    pub invest_relative_satisficing: usize,
    /// Satisficing and better than investing
    pub wait_relative_satisficing: usize,
    /// Savage criterion per strategy, Invest first
    pub regret: Vec<RegretSummary>,
    /// Strategy with the smallest maximum regret
    pub min_max_regret: String,
}

impl RobustnessReport {
    pub fn invest_max_regret(&self) -> f64 {
        self.regret[0].max_regret
    }

    pub fn wait_max_regret(&self) -> f64 {
        self.regret[1].max_regret
    }
}

/// Regions of the uncertainty space where the policy has no regret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub reliable: usize,
    pub unreliable: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    pub scenarios: Vec<ScenarioNode>,
    /// Text rendering of the fitted tree
    pub tree: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub result: SobolResult,
    pub groups: Vec<GroupIndices>,
}

/// Everything one run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub config: AnalysisConfig,
    pub robustness: RobustnessReport,
    pub scenarios: Option<ScenarioReport>,
    pub sensitivity: Option<SensitivityReport>,
    /// One row per SOW, inputs followed by responses
    #[serde(skip)]
    pub results: DataSet,
}

/// One configured analysis of the BECCS model
pub struct Analysis {
    config: AnalysisConfig,
    model: BeccsModel,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let model = BeccsModel::new(&config.price_trend);
        model.spec().validate()?;

        let analysis = Self { config, model };
        analysis.model.spec().check_policy(&analysis.policy())?;
        Ok(analysis)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn model(&self) -> &BeccsModel {
        &self.model
    }

    /// Lever settings applied to every SOW
    pub fn policy(&self) -> Record {
        [(
            INVESTMENT_DECISION.to_string(),
            self.config.policy.investment_decision,
        )]
        .into_iter()
        .collect()
    }

    /// Run every enabled stage
    pub fn run(&self) -> Result<AnalysisResults> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        tracing::info!(
            %run_id,
            sow_count = self.config.sample_size,
            seed = self.config.seed,
            trend = self.config.price_trend.name(),
            "Starting BECCS RDM analysis"
        );

        let results = self.evaluate_ensemble()?;
        let robustness = self.robustness(&results)?;

        let scenarios = if self.config.cart.enabled {
            Some(self.scenario_discovery(&results)?)
        } else {
            tracing::info!("Scenario discovery disabled");
            None
        };

        let sensitivity = if self.config.sobol.enabled {
            Some(self.sensitivity()?)
        } else {
            tracing::info!("Sensitivity analysis disabled");
            None
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(elapsed_ms, "Analysis complete");

        Ok(AnalysisResults {
            run_id,
            started_at,
            elapsed_ms,
            config: self.config.clone(),
            robustness,
            scenarios,
            sensitivity,
            results,
        })
    }

    /// Sample the SOWs, apply the policy and evaluate the model in each
    pub fn evaluate_ensemble(&self) -> Result<DataSet> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let sows = sample_lhs(self.model.spec(), self.config.sample_size, &mut rng);
        let inputs = update(sows, &self.policy());

        tracing::info!(sows = inputs.len(), "Evaluating model");
        let results = evaluate(&self.model, &inputs, self.config.seed)?;
        tracing::debug!(columns = results.columns().len(), "Evaluation finished");
        Ok(results)
    }

    pub fn robustness(&self, results: &DataSet) -> Result<RobustnessReport> {
        tracing::info!("Robustness analysis");

        let invest = results.count(&format!("{NPV_INVEST} > 0"))?;
        let wait = results.count(&format!("{NPV_WAIT} > 0"))?;
        let invest_relative = results.count(&format!("{NPV_INVEST} > 0 and {NPV_INVEST} > {NPV_WAIT}"))?;
        let wait_relative = results.count(&format!("{NPV_WAIT} > 0 and {NPV_INVEST} < {NPV_WAIT}"))?;

        let regret = regret_summary(results, &[NPV_INVEST, NPV_WAIT], Direction::Maximize)?;
        let min_max_regret = beccs_rdm::min_max_regret(&regret)
            .map(|r| r.alternative.clone())
            .unwrap_or_default();

        let report = RobustnessReport {
            sows: results.len(),
            invest_satisficing: invest,
            wait_satisficing: wait,
            invest_relative_satisficing: invest_relative,
            wait_relative_satisficing: wait_relative,
            regret,
            min_max_regret,
        };
        tracing::debug!(?report, "Robustness metrics");
        Ok(report)
    }

    /// CART over the uncertainties separating regret-free SOWs from the rest
    pub fn scenario_discovery(&self, results: &DataSet) -> Result<ScenarioReport> {
        tracing::info!("Scenario discovery");

        let labels = results.apply(&format!("{REGRET} == 0"), RELIABLE, UNRELIABLE)?;
        let reliable = labels.iter().filter(|l| *l == RELIABLE).count();

        let config = CartConfig {
            min_samples_leaf: self.config.cart.min_samples_leaf,
            max_depth: self.config.cart.max_depth,
            ..Default::default()
        };
        let features = self.model.spec().uncertainty_names();
        let tree = Cart::fit(results, &labels, &features, &config)?;

        // A run without any regret-free SOW has no reliable scenarios
        let scenarios = match tree.scenarios(RELIABLE) {
            Ok(nodes) => nodes,
            Err(RdmError::InvalidInput(_)) => Vec::new(),
            Err(e) => return Err(AnalysisError::from(e)),
        };
        tracing::info!(
            nodes = tree.node_count(),
            scenarios = scenarios.len(),
            "Scenario discovery complete"
        );

        Ok(ScenarioReport {
            reliable,
            unreliable: labels.len() - reliable,
            node_count: tree.node_count(),
            leaf_count: tree.leaf_count(),
            scenarios,
            tree: tree.render(),
        })
    }

    /// Sobol indices of the configured response under the policy
    pub fn sensitivity(&self) -> Result<SensitivityReport> {
        tracing::info!(response = %self.config.sobol.response, "Sensitivity analysis");

        let config = SobolConfig {
            samples: self.config.sobol.samples,
            second_order: self.config.sobol.second_order,
            seed: self.config.seed,
            ..Default::default()
        };
        let result = sobol::sa(&self.model, &self.config.sobol.response, &self.policy(), &config)?;
        let groups = result.grouped(&SENSITIVITY_GROUPS)?;

        if let Some(top) = result.ranked_by_total().first() {
            tracing::info!(uncertainty = %top.name, st = top.st, "Largest total sensitivity");
        }
        Ok(SensitivityReport { result, groups })
    }
}
