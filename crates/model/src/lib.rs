//! BECCS investment model
//!
//! Values the decision to retrofit a biomass CHP plant with carbon capture
//! and storage for a single state of the world:
//!
//! - **plant**: operating conditions of the plant with and without capture
//! - **prices**: stochastic electricity, heat, NE and ETS price trajectories
//! - **finance**: NPV and IRR
//! - **investment**: cash flows of the Wait and Invest strategies and regret

pub mod error;
pub mod finance;
pub mod investment;
pub mod plant;
pub mod prices;

pub use error::{ModelError, Result};
pub use finance::{discount_factor, irr, npv};
pub use investment::{
    BeccsInvestment, CashFlows, CostInputs, Decision, InvestmentInputs, InvestmentOutcome,
    MarketInputs, PolicyInputs,
};
pub use plant::{BASE_YEAR, HORIZON_YEARS, PlantConditions};
pub use prices::{BoundedWalk, EtsPath, PriceScenario, TrendShape, Trajectory};
