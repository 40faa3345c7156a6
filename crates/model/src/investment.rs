//! BECCS investment decision for one state of the world
//!
//! Two strategies are valued over the 2024-2050 horizon:
//!
//! - **Wait**: keep running the biomass CHP plant without capture.
//! - **Invest**: build the capture unit over the first two years, then sell
//!   negative emissions (NEs) at the best price offered by the voluntary
//!   market or any active support policy.
//!
//! Regret of the chosen strategy is its NPV shortfall against the better of
//! the two.

use crate::error::{ModelError, Result};
use crate::finance::{irr, npv};
use crate::plant::{BASE_YEAR, HORIZON_YEARS, PlantConditions};
use crate::prices::{BoundedWalk, EtsPath, PriceScenario, Trajectory};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Years spent building the capture unit (CAPEX split evenly)
pub const CONSTRUCTION_YEARS: usize = 2;

/// Last year in which reversed auctions subsidise the specific cost
pub const AUCTION_END_YEAR: f64 = 2040.0;

/// Investment decision under evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Wait,
    #[default]
    Invest,
}

impl Decision {
    /// Decode the lever value (0 = Wait, 1 = Invest)
    pub fn from_lever(value: f64) -> Result<Self> {
        if value == 0.0 {
            Ok(Self::Wait)
        } else if value == 1.0 {
            Ok(Self::Invest)
        } else {
            Err(ModelError::invalid(
                "investment_decision",
                value,
                "expected 0 (wait) or 1 (invest)",
            ))
        }
    }

    pub fn as_lever(self) -> f64 {
        match self {
            Self::Wait => 0.0,
            Self::Invest => 1.0,
        }
    }
}

/// Starting prices and trend parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInputs {
    /// Electricity price in 2024 [EUR/MWh]
    pub electricity_2024: f64,
    /// Heat price in 2024 [EUR/MWh]
    pub heat_2024: f64,
    /// Voluntary NE price in 2024 [EUR/tCO2]
    pub ne_2024: f64,
    /// ETS allowance price in 2024 [EUR/tCO2]
    pub ets_2024: f64,
    /// Biomass price, constant [EUR/MWh]
    pub biomass: f64,
    /// Electricity trend (-1 falling .. 1 rising)
    pub electricity_trend: f64,
    /// Heat trend (-1 falling .. 1 rising)
    pub heat_trend: f64,
    /// NE trend (-1 falling .. 1 rising)
    pub ne_trend: f64,
    /// ETS growth strength (-1 weak .. 1 strong)
    pub ets_trend: f64,
}

impl Default for MarketInputs {
    fn default() -> Self {
        Self {
            electricity_2024: 50.0,
            heat_2024: 50.0,
            ne_2024: 30.0,
            ets_2024: 80.0,
            biomass: 25.0,
            electricity_trend: 0.4,
            heat_trend: -0.5,
            ne_trend: 0.3,
            ets_trend: 0.0,
        }
    }
}

/// Capture unit valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostInputs {
    pub discount_rate: f64,
    /// Yearly reduction of the specific cost after construction
    pub learning_rate: f64,
    /// [EUR]
    pub capex: f64,
    /// [EUR/year]
    pub opex_fixed: f64,
    /// [EUR/tCO2]
    pub opex_variable: f64,
    /// [EUR/tCO2]
    pub transportation: f64,
    /// [EUR/tCO2]
    pub storage: f64,
}

impl Default for CostInputs {
    fn default() -> Self {
        Self {
            discount_rate: 0.06,
            learning_rate: 0.01,
            capex: 200e6,
            opex_fixed: 20e6,
            opex_variable: 44.0,
            transportation: 22.0,
            storage: 14.5,
        }
    }
}

/// Policy states. Years are real-valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInputs {
    /// Share of the specific cost covered by reversed auctions (0-1)
    pub auction: f64,
    /// NE quota obligations start (NE price at least the specific cost)
    pub quota_year: f64,
    /// NEs integrated into EU trading (NE price at least the ETS price)
    pub eu_integration_year: f64,
    /// Biomass use severely restricted (no NE sales, Wait pays allowances)
    pub biomass_ban_year: f64,
    /// NEs may be claimed and sold on the voluntary market after this year
    pub claim_year: f64,
}

impl Default for PolicyInputs {
    fn default() -> Self {
        Self {
            auction: 0.5,
            quota_year: 2035.0,
            eu_integration_year: 2040.0,
            biomass_ban_year: 2051.0,
            claim_year: 2026.0,
        }
    }
}

/// All inputs of one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentInputs {
    pub decision: Decision,
    pub market: MarketInputs,
    pub costs: CostInputs,
    pub policy: PolicyInputs,
}

impl InvestmentInputs {
    /// Reject values the cash flow model cannot handle
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("pelectricity_2024", self.market.electricity_2024),
            ("pheat_2024", self.market.heat_2024),
            ("pNE_2024", self.market.ne_2024),
            ("pETS_2024", self.market.ets_2024),
            ("pbiomass", self.market.biomass),
            ("Learning_rate", self.costs.learning_rate),
            ("CAPEX", self.costs.capex),
            ("OPEX_fixed", self.costs.opex_fixed),
            ("OPEX_variable", self.costs.opex_variable),
            ("Cost_transportation", self.costs.transportation),
            ("Cost_storage", self.costs.storage),
            ("AUCTION", self.policy.auction),
            ("yQUOTA", self.policy.quota_year),
            ("yEUint", self.policy.eu_integration_year),
            ("yBIOban", self.policy.biomass_ban_year),
            ("yCLAIM", self.policy.claim_year),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ModelError::invalid(name, value, "must be finite"));
            }
        }

        let rate = self.costs.discount_rate;
        if !rate.is_finite() || rate <= -1.0 {
            return Err(ModelError::invalid("Discount_rate", rate, "must be greater than -1"));
        }
        Ok(())
    }
}

/// Annual series behind the headline numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlows {
    /// Wait strategy [EUR]
    pub wait: Vec<f64>,
    /// Invest strategy, used for NPV [EUR]
    pub invest: Vec<f64>,
    /// Capture-only flows (CAPEX, energy penalty, NE margin) used for IRR [EUR]
    pub invest_irr: Vec<f64>,
    /// Best NE price offered each year [EUR/tCO2]
    pub ne_price_supported: Vec<f64>,
    /// Specific capture cost from the first operating year on [EUR/tCO2]
    pub cost_specific: Vec<f64>,
}

/// Responses of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOutcome {
    pub decision: Decision,
    /// Mean supported NE price [EUR/tCO2]
    pub pne_mean: f64,
    pub npv_invest: f64,
    pub npv_wait: f64,
    /// NPV shortfall of `decision` against the better strategy
    pub regret: f64,
    /// IRR of the capture-only flows, 0 when undefined
    pub irr: f64,
    pub pelectricity_mean: f64,
    pub pheat_mean: f64,
    /// ETS price in the final year [EUR/tCO2]
    pub pets_2050: f64,
    /// Mean specific cost over the operating years [EUR/tCO2]
    pub cost_specific_mean: f64,
    pub prices: PriceScenario,
    pub cash_flows: CashFlows,
}

impl InvestmentOutcome {
    /// Regret for either decision in this state of the world
    pub fn regret_of(&self, decision: Decision) -> f64 {
        let best = self.npv_invest.max(self.npv_wait);
        match decision {
            Decision::Invest => best - self.npv_invest,
            Decision::Wait => best - self.npv_wait,
        }
    }
}

/// Cash flow model of the plant with price generators for each commodity
#[derive(Debug, Clone)]
pub struct BeccsInvestment {
    pub plant: PlantConditions,
    pub electricity: BoundedWalk,
    pub heat: BoundedWalk,
    pub negative_emission: BoundedWalk,
    pub ets: EtsPath,
}

impl Default for BeccsInvestment {
    fn default() -> Self {
        Self::new(PlantConditions::default())
    }
}

impl BeccsInvestment {
    pub fn new(plant: PlantConditions) -> Self {
        Self {
            plant,
            electricity: BoundedWalk::ELECTRICITY,
            heat: BoundedWalk::HEAT,
            negative_emission: BoundedWalk::NEGATIVE_EMISSION,
            ets: EtsPath::default(),
        }
    }

    /// Draw the four price trajectories for one state of the world
    pub fn simulate_prices<R: Rng + ?Sized>(
        &self,
        market: &MarketInputs,
        rng: &mut R,
    ) -> Result<PriceScenario> {
        Ok(PriceScenario {
            electricity: self
                .electricity
                .generate(market.electricity_2024, market.electricity_trend, rng)?,
            heat: self.heat.generate(market.heat_2024, market.heat_trend, rng)?,
            negative_emission: self
                .negative_emission
                .generate(market.ne_2024, market.ne_trend, rng)?,
            ets: self.ets.generate(market.ets_2024, market.ets_trend, rng)?,
        })
    }

    /// Simulate prices and value both strategies
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        inputs: &InvestmentInputs,
        rng: &mut R,
    ) -> Result<InvestmentOutcome> {
        inputs.validate()?;
        let prices = self.simulate_prices(&inputs.market, rng)?;
        self.evaluate_with_prices(inputs, prices)
    }

    /// Value both strategies on given price trajectories
    pub fn evaluate_with_prices(
        &self,
        inputs: &InvestmentInputs,
        prices: PriceScenario,
    ) -> Result<InvestmentOutcome> {
        inputs.validate()?;
        for (name, path) in [
            ("electricity", &prices.electricity),
            ("heat", &prices.heat),
            ("negative_emission", &prices.negative_emission),
            ("ets", &prices.ets),
        ] {
            if path.len() != HORIZON_YEARS {
                return Err(ModelError::invalid(
                    name,
                    path.len() as f64,
                    format!("trajectory must cover {HORIZON_YEARS} years"),
                ));
            }
        }

        let rate = inputs.costs.discount_rate;
        let wait = self.wait_cash_flows(inputs, &prices);
        let (invest, invest_irr, ne_price_supported, cost_specific) =
            self.invest_cash_flows(inputs, &prices);

        let npv_wait = npv(rate, &wait);
        let npv_invest = npv(rate, &invest);
        let best = npv_invest.max(npv_wait);
        let regret = match inputs.decision {
            Decision::Invest => best - npv_invest,
            Decision::Wait => best - npv_wait,
        };

        Ok(InvestmentOutcome {
            decision: inputs.decision,
            pne_mean: Trajectory::new(ne_price_supported.clone()).mean(),
            npv_invest,
            npv_wait,
            regret,
            irr: irr(&invest_irr).unwrap_or(0.0),
            pelectricity_mean: prices.electricity.mean(),
            pheat_mean: prices.heat.mean(),
            pets_2050: prices.ets.final_value().unwrap_or(0.0),
            cost_specific_mean: Trajectory::new(cost_specific.clone()).mean(),
            prices,
            cash_flows: CashFlows {
                wait,
                invest,
                invest_irr,
                ne_price_supported,
                cost_specific,
            },
        })
    }

    fn wait_cash_flows(&self, inputs: &InvestmentInputs, prices: &PriceScenario) -> Vec<f64> {
        let plant = &self.plant;
        let co2 = plant.co2_captured();

        (0..HORIZON_YEARS)
            .map(|t| {
                let mut cf = plant.energy_cash_flow(
                    plant.power_output_wait_mw,
                    plant.heat_output_wait_mw,
                    prices.electricity[t],
                    prices.heat[t],
                    inputs.market.biomass,
                );
                if liability_year(t) >= inputs.policy.biomass_ban_year {
                    cf -= co2 * prices.ets[t];
                }
                cf
            })
            .collect()
    }

    fn invest_cash_flows(
        &self,
        inputs: &InvestmentInputs,
        prices: &PriceScenario,
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let plant = &self.plant;
        let costs = &inputs.costs;
        let policy = &inputs.policy;
        let co2 = plant.co2_captured();

        let mut flows = Vec::with_capacity(HORIZON_YEARS);
        let mut irr_flows = Vec::with_capacity(HORIZON_YEARS);
        let mut ne_supported = Vec::with_capacity(HORIZON_YEARS);
        let mut cost_specific_series = Vec::with_capacity(HORIZON_YEARS - CONSTRUCTION_YEARS);

        let capex_share = costs.capex / CONSTRUCTION_YEARS as f64;
        for t in 0..CONSTRUCTION_YEARS {
            let energy = plant.energy_cash_flow(
                plant.power_output_wait_mw,
                plant.heat_output_wait_mw,
                prices.electricity[t],
                prices.heat[t],
                inputs.market.biomass,
            );
            flows.push(energy - capex_share);
            irr_flows.push(-capex_share);
            ne_supported.push(prices.negative_emission[t]);
        }

        let base_specific = (costs.opex_variable + costs.transportation + costs.storage)
            + costs.opex_fixed / co2;

        for t in CONSTRUCTION_YEARS..HORIZON_YEARS {
            let year = calendar_year(t);
            let energy = plant.energy_cash_flow(
                plant.power_output_invest_mw,
                plant.heat_output_invest_mw,
                prices.electricity[t],
                prices.heat[t],
                inputs.market.biomass,
            );
            let penalty = -plant.energy_penalty(prices.electricity[t], prices.heat[t]);

            let mut cost_specific =
                base_specific * (1.0 - costs.learning_rate * (t - CONSTRUCTION_YEARS) as f64);

            // Best price offered by the voluntary market or an active policy
            let mut ne_price = prices.negative_emission[t];
            if year >= policy.quota_year {
                ne_price = ne_price.max(cost_specific);
            }
            if year >= policy.eu_integration_year {
                ne_price = ne_price.max(prices.ets[t]);
            }
            if year <= AUCTION_END_YEAR {
                cost_specific *= 1.0 - policy.auction;
            }

            if !(year < policy.biomass_ban_year && year > policy.claim_year) {
                ne_price = 0.0;
            }
            let co2_margin = (ne_price - cost_specific) * co2;

            flows.push(energy + co2_margin);

            let mut irr_flow = penalty + co2_margin;
            if liability_year(t) >= policy.biomass_ban_year {
                irr_flow += co2 * prices.ets[t];
            }
            irr_flows.push(irr_flow);
            ne_supported.push(ne_price);
            cost_specific_series.push(cost_specific);
        }

        (flows, irr_flows, ne_supported, cost_specific_series)
    }
}

/// Calendar year of slot `t`
#[inline]
fn calendar_year(t: usize) -> f64 {
    (BASE_YEAR + t as i32) as f64
}

/// Year compared against the biomass ban for allowance liability.
/// Liability triggers one slot ahead of the other policy checks.
#[inline]
fn liability_year(t: usize) -> f64 {
    calendar_year(t) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn flat_prices(electricity: f64, heat: f64, ne: f64, ets: f64) -> PriceScenario {
        PriceScenario {
            electricity: vec![electricity; HORIZON_YEARS].into(),
            heat: vec![heat; HORIZON_YEARS].into(),
            negative_emission: vec![ne; HORIZON_YEARS].into(),
            ets: vec![ets; HORIZON_YEARS].into(),
        }
    }

    #[test]
    fn test_decision_lever_round_trip() {
        assert_eq!(Decision::from_lever(0.0).unwrap(), Decision::Wait);
        assert_eq!(Decision::from_lever(1.0).unwrap(), Decision::Invest);
        assert!(Decision::from_lever(0.5).is_err());
        assert_relative_eq!(Decision::Invest.as_lever(), 1.0);
    }

    #[test]
    fn test_wait_cash_flow_matches_hand_calculation() {
        let model = BeccsInvestment::default();
        let inputs = InvestmentInputs::default();
        let outcome = model
            .evaluate_with_prices(&inputs, flat_prices(50.0, 50.0, 30.0, 80.0))
            .unwrap();

        let plant = PlantConditions::default();
        let expected = (110.0 * 50.0 + 287.0 * 50.0 - 362.0 * 25.0) * plant.operating_hours()
            - plant.opex_power_plant();
        assert_relative_eq!(outcome.cash_flows.wait[0], expected);
        assert_eq!(outcome.cash_flows.wait.len(), HORIZON_YEARS);
        assert_relative_eq!(
            outcome.npv_wait,
            npv(0.06, &vec![expected; HORIZON_YEARS]),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_construction_years_pay_capex() {
        let model = BeccsInvestment::default();
        let inputs = InvestmentInputs::default();
        let outcome = model
            .evaluate_with_prices(&inputs, flat_prices(50.0, 50.0, 30.0, 80.0))
            .unwrap();

        let flows = &outcome.cash_flows;
        assert_relative_eq!(flows.invest[0], flows.wait[0] - 100e6);
        assert_relative_eq!(flows.invest[1], flows.wait[1] - 100e6);
        assert_relative_eq!(flows.invest_irr[0], -100e6);
        assert_relative_eq!(flows.ne_price_supported[0], 30.0);
        assert_eq!(flows.cost_specific.len(), HORIZON_YEARS - CONSTRUCTION_YEARS);
    }

    #[test]
    fn test_no_ne_revenue_before_claim_year() {
        let model = BeccsInvestment::default();
        let mut inputs = InvestmentInputs::default();
        inputs.policy.claim_year = 2050.0;
        inputs.policy.quota_year = 2100.0;
        inputs.policy.eu_integration_year = 2100.0;

        let outcome = model
            .evaluate_with_prices(&inputs, flat_prices(50.0, 50.0, 300.0, 80.0))
            .unwrap();

        for t in CONSTRUCTION_YEARS..HORIZON_YEARS {
            assert_relative_eq!(outcome.cash_flows.ne_price_supported[t], 0.0);
        }
    }

    #[test]
    fn test_quota_raises_price_to_specific_cost() {
        let model = BeccsInvestment::default();
        let mut inputs = InvestmentInputs::default();
        inputs.policy.quota_year = 2024.0;
        inputs.policy.eu_integration_year = 2100.0;
        inputs.policy.claim_year = 2023.0;
        inputs.policy.auction = 0.0;

        let outcome = model
            .evaluate_with_prices(&inputs, flat_prices(50.0, 50.0, 1.0, 80.0))
            .unwrap();

        // With quota and no auction, NE margin is exactly zero
        let flows = &outcome.cash_flows;
        for (i, t) in (CONSTRUCTION_YEARS..HORIZON_YEARS).enumerate() {
            assert_relative_eq!(flows.ne_price_supported[t], flows.cost_specific[i]);
        }
    }

    #[test]
    fn test_eu_integration_lifts_ne_price_to_ets() {
        let model = BeccsInvestment::default();
        let mut inputs = InvestmentInputs::default();
        inputs.policy.eu_integration_year = 2030.0;
        inputs.policy.quota_year = 2100.0;
        inputs.policy.claim_year = 2023.0;

        let outcome = model
            .evaluate_with_prices(&inputs, flat_prices(50.0, 50.0, 30.0, 150.0))
            .unwrap();

        let supported = &outcome.cash_flows.ne_price_supported;
        assert_relative_eq!(supported[5], 30.0); // 2029
        assert_relative_eq!(supported[6], 150.0); // 2030
    }

    #[test]
    fn test_biomass_ban_charges_wait_allowances() {
        let model = BeccsInvestment::default();
        let mut inputs = InvestmentInputs::default();
        inputs.policy.biomass_ban_year = 2030.0;

        let outcome = model
            .evaluate_with_prices(&inputs, flat_prices(50.0, 50.0, 30.0, 100.0))
            .unwrap();

        let flows = &outcome.cash_flows.wait;
        let co2 = PlantConditions::default().co2_captured();
        // Slot 7 (2031) is the first with allowance liability
        assert_relative_eq!(flows[6], flows[0]);
        assert_relative_eq!(flows[7], flows[0] - co2 * 100.0, max_relative = 1e-12);
    }

    #[test]
    fn test_regret_is_zero_for_the_better_decision() {
        let model = BeccsInvestment::default();
        let mut rng = StdRng::seed_from_u64(3);

        for decision in [Decision::Invest, Decision::Wait] {
            let inputs = InvestmentInputs {
                decision,
                ..Default::default()
            };
            let outcome = model.evaluate(&inputs, &mut rng).unwrap();
            assert!(outcome.regret >= 0.0);
            assert_relative_eq!(outcome.regret, outcome.regret_of(decision));
            assert!(
                outcome.regret_of(Decision::Invest) == 0.0
                    || outcome.regret_of(Decision::Wait) == 0.0
            );
        }
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let model = BeccsInvestment::default();
        let inputs = InvestmentInputs::default();

        let a = model.evaluate(&inputs, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = model.evaluate(&inputs, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_invalid_discount_rate() {
        let model = BeccsInvestment::default();
        let mut inputs = InvestmentInputs::default();
        inputs.costs.discount_rate = -1.0;

        let err = model
            .evaluate(&inputs, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { ref name, .. } if name == "Discount_rate"));
    }

    #[test]
    fn test_rejects_short_trajectory() {
        let model = BeccsInvestment::default();
        let mut prices = flat_prices(50.0, 50.0, 30.0, 80.0);
        prices.heat = vec![50.0; 3].into();

        assert!(model
            .evaluate_with_prices(&InvestmentInputs::default(), prices)
            .is_err());
    }
}
