//! Power plant operating conditions
//!
//! Operating conditions are routinely managed by the plant operator and are
//! therefore not treated as uncertainties.

use serde::{Deserialize, Serialize};

/// First modelled year (t = 0)
pub const BASE_YEAR: i32 = 2024;

/// Number of annual slots, 2024 through 2050 inclusive
pub const HORIZON_YEARS: usize = 27;

/// Hours per (non-leap) year
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Combined heat and power plant, with and without the capture unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantConditions {
    /// Biomass input [MW]
    pub biomass_input_mw: f64,
    /// Power output without capture [MW]
    pub power_output_wait_mw: f64,
    /// Heat output without capture [MW]
    pub heat_output_wait_mw: f64,
    /// Power output with capture [MW]
    pub power_output_invest_mw: f64,
    /// Heat output with capture [MW]
    pub heat_output_invest_mw: f64,
    /// Share of the year the plant runs (0-1)
    pub availability: f64,
    /// Captured CO2 per MWh of biomass [tCO2/MWh]
    pub capture_rate: f64,
    /// Share of captured CO2 lost across the transport and storage chain (0-1)
    pub leakage: f64,
    /// Fixed plant OPEX per MW of biomass input [EUR/MW/year]
    pub opex_fixed_per_mw: f64,
    /// Variable plant OPEX per MWh of biomass input [EUR/MWh]
    pub opex_variable_per_mwh: f64,
}

impl Default for PlantConditions {
    fn default() -> Self {
        Self {
            biomass_input_mw: 362.0,
            power_output_wait_mw: 110.0,
            heat_output_wait_mw: 287.0,
            power_output_invest_mw: 53.0,
            heat_output_invest_mw: 337.0,
            availability: 0.7,
            capture_rate: 0.3,
            leakage: 0.05,
            opex_fixed_per_mw: 29_000.0,
            opex_variable_per_mwh: 0.5,
        }
    }
}

impl PlantConditions {
    /// Operating hours per year [h]
    #[inline]
    pub fn operating_hours(&self) -> f64 {
        HOURS_PER_YEAR * self.availability
    }

    /// Net stored CO2 per year after leakage [tCO2/year]
    #[inline]
    pub fn co2_captured(&self) -> f64 {
        self.capture_rate * self.biomass_input_mw * self.operating_hours() * (1.0 - self.leakage)
    }

    /// Plant OPEX excluding the capture unit [EUR/year]
    #[inline]
    pub fn opex_power_plant(&self) -> f64 {
        self.opex_fixed_per_mw * self.biomass_input_mw
            + self.opex_variable_per_mwh * self.operating_hours() * self.biomass_input_mw
    }

    /// Energy cash flow for one year before capture costs [EUR/year]
    pub fn energy_cash_flow(
        &self,
        power_mw: f64,
        heat_mw: f64,
        p_electricity: f64,
        p_heat: f64,
        p_biomass: f64,
    ) -> f64 {
        (power_mw * p_electricity + heat_mw * p_heat - self.biomass_input_mw * p_biomass)
            * self.operating_hours()
            - self.opex_power_plant()
    }

    /// Revenue lost to the capture unit's energy penalty [EUR/year]
    pub fn energy_penalty(&self, p_electricity: f64, p_heat: f64) -> f64 {
        ((self.power_output_wait_mw - self.power_output_invest_mw) * p_electricity
            + (self.heat_output_wait_mw - self.heat_output_invest_mw) * p_heat)
            * self.operating_hours()
    }
}
