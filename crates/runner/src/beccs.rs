//! The BECCS investment model as an exploratory model
//!
//! Maps SOW records onto [`InvestmentInputs`] and outcomes back onto
//! response columns. Inputs a record leaves unset take the model's nominal
//! values, so a SOW only needs to carry what it varies.

use crate::config::PriceTrend;
use beccs_model::{BeccsInvestment, Decision, InvestmentInputs, InvestmentOutcome, ModelError};
use beccs_rdm::{Lever, Model, ModelSpec, Parameter, Record, Response, Uncertainty};
use rand::rngs::StdRng;

pub const INVESTMENT_DECISION: &str = "investment_decision";

pub const PNE_MEAN: &str = "pNE_mean";
pub const NPV_INVEST: &str = "NPV_invest";
pub const REGRET: &str = "Regret";
pub const NPV_WAIT: &str = "NPV_wait";
pub const IRR: &str = "IRR";
pub const PELECTRICITY_MEAN: &str = "pelectricity_mean";
pub const PHEAT_MEAN: &str = "pheat_mean";
pub const PETS_2050: &str = "pETS_2050";
pub const COST_SPECIFIC: &str = "Cost_specific";

/// Uncertainty groups used to summarize total sensitivity
pub const SENSITIVITY_GROUPS: [(&str, &[&str]); 3] = [
    (
        "Commodity prices",
        &["pNE_2024", "pNE_dt", "pbiomass", "pETS_2024", "pETS_dt"],
    ),
    (
        "BECCS valuations",
        &[
            "Discount_rate",
            "CAPEX",
            "OPEX_fixed",
            "OPEX_variable",
            "Cost_transportation",
            "Cost_storage",
            "Learning_rate",
        ],
    ),
    (
        "Policy states",
        &["AUCTION", "yEUint", "yQUOTA", "yBIOban", "yCLAIM"],
    ),
];

pub struct BeccsModel {
    spec: ModelSpec,
    investment: BeccsInvestment,
}

impl BeccsModel {
    /// Model with the electricity and heat trends of `trend` as defaults
    pub fn new(trend: &PriceTrend) -> Self {
        let mut nominal = InvestmentInputs::default();
        nominal.market.electricity_trend = trend.electricity();
        nominal.market.heat_trend = trend.heat();

        let parameters = to_record(&nominal)
            .into_iter()
            .map(|(name, value)| Parameter::with_default(name, value))
            .collect();

        let spec = ModelSpec::new()
            .with_parameters(parameters)
            .with_responses(vec![
                Response::info(PNE_MEAN),
                Response::maximize(NPV_INVEST),
                Response::minimize(REGRET),
                Response::maximize(NPV_WAIT),
                Response::maximize(IRR),
                Response::info(PELECTRICITY_MEAN),
                Response::info(PHEAT_MEAN),
                Response::info(PETS_2050),
                Response::info(COST_SPECIFIC),
            ])
            .with_levers(vec![Lever::real(INVESTMENT_DECISION, 0.0, 1.0, 2)])
            .with_uncertainties(vec![
                Uncertainty::uniform("pNE_2024", 20.0, 140.0),
                Uncertainty::uniform("pNE_dt", -1.0, 1.0),
                Uncertainty::uniform("pbiomass", 15.0, 35.0),
                Uncertainty::uniform("pETS_2024", 60.0, 100.0),
                Uncertainty::uniform("pETS_dt", -1.0, 1.0),
                Uncertainty::uniform("Discount_rate", 0.04, 0.10),
                Uncertainty::uniform("CAPEX", 100e6, 300e6),
                Uncertainty::uniform("OPEX_fixed", 18e6, 22e6),
                Uncertainty::uniform("OPEX_variable", 33.0, 55.0),
                Uncertainty::uniform("Cost_transportation", 17.0, 27.0),
                Uncertainty::uniform("Cost_storage", 6.0, 23.0),
                Uncertainty::uniform("Learning_rate", 0.0075, 0.0125),
                Uncertainty::uniform("AUCTION", 0.0, 1.0),
                Uncertainty::uniform("yQUOTA", 2030.0, 2050.0),
                Uncertainty::uniform("yEUint", 2035.0, 2050.0),
                Uncertainty::uniform("yBIOban", 2030.0, 2050.0),
                Uncertainty::uniform("yCLAIM", 2023.0, 2050.0),
            ]);

        Self {
            spec,
            investment: BeccsInvestment::default(),
        }
    }

    pub fn investment(&self) -> &BeccsInvestment {
        &self.investment
    }
}

impl Model for BeccsModel {
    type Error = ModelError;

    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn evaluate(&self, inputs: &Record, rng: &mut StdRng) -> Result<Record, ModelError> {
        let inputs = from_record(inputs)?;
        let outcome = self.investment.evaluate(&inputs, rng)?;
        Ok(responses(&outcome))
    }
}

/// Column names and values of every model input
pub fn to_record(inputs: &InvestmentInputs) -> Record {
    let m = &inputs.market;
    let c = &inputs.costs;
    let p = &inputs.policy;
    [
        (INVESTMENT_DECISION, inputs.decision.as_lever()),
        ("pelectricity_2024", m.electricity_2024),
        ("pheat_2024", m.heat_2024),
        ("pNE_2024", m.ne_2024),
        ("pETS_2024", m.ets_2024),
        ("pbiomass", m.biomass),
        ("pelectricity_dt", m.electricity_trend),
        ("pheat_dt", m.heat_trend),
        ("pNE_dt", m.ne_trend),
        ("pETS_dt", m.ets_trend),
        ("Discount_rate", c.discount_rate),
        ("Learning_rate", c.learning_rate),
        ("CAPEX", c.capex),
        ("OPEX_fixed", c.opex_fixed),
        ("OPEX_variable", c.opex_variable),
        ("Cost_transportation", c.transportation),
        ("Cost_storage", c.storage),
        ("AUCTION", p.auction),
        ("yQUOTA", p.quota_year),
        ("yEUint", p.eu_integration_year),
        ("yBIOban", p.biomass_ban_year),
        ("yCLAIM", p.claim_year),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Inputs from a record; unset columns keep their nominal values
pub fn from_record(record: &Record) -> Result<InvestmentInputs, ModelError> {
    let mut inputs = InvestmentInputs::default();
    if let Some(&lever) = record.get(INVESTMENT_DECISION) {
        inputs.decision = Decision::from_lever(lever)?;
    }

    let m = &mut inputs.market;
    let c = &mut inputs.costs;
    let p = &mut inputs.policy;
    for (name, slot) in [
        ("pelectricity_2024", &mut m.electricity_2024),
        ("pheat_2024", &mut m.heat_2024),
        ("pNE_2024", &mut m.ne_2024),
        ("pETS_2024", &mut m.ets_2024),
        ("pbiomass", &mut m.biomass),
        ("pelectricity_dt", &mut m.electricity_trend),
        ("pheat_dt", &mut m.heat_trend),
        ("pNE_dt", &mut m.ne_trend),
        ("pETS_dt", &mut m.ets_trend),
        ("Discount_rate", &mut c.discount_rate),
        ("Learning_rate", &mut c.learning_rate),
        ("CAPEX", &mut c.capex),
        ("OPEX_fixed", &mut c.opex_fixed),
        ("OPEX_variable", &mut c.opex_variable),
        ("Cost_transportation", &mut c.transportation),
        ("Cost_storage", &mut c.storage),
        ("AUCTION", &mut p.auction),
        ("yQUOTA", &mut p.quota_year),
        ("yEUint", &mut p.eu_integration_year),
        ("yBIOban", &mut p.biomass_ban_year),
        ("yCLAIM", &mut p.claim_year),
    ] {
        if let Some(&value) = record.get(name) {
            *slot = value;
        }
    }
    Ok(inputs)
}

/// Response columns of one outcome
pub fn responses(outcome: &InvestmentOutcome) -> Record {
    [
        (PNE_MEAN, outcome.pne_mean),
        (NPV_INVEST, outcome.npv_invest),
        (REGRET, outcome.regret),
        (NPV_WAIT, outcome.npv_wait),
        (IRR, outcome.irr),
        (PELECTRICITY_MEAN, outcome.pelectricity_mean),
        (PHEAT_MEAN, outcome.pheat_mean),
        (PETS_2050, outcome.pets_2050),
        (COST_SPECIFIC, outcome.cost_specific_mean),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}
