//! BECCS Runner - robust decision-making analysis of a BECCS retrofit
//!
//! Orchestrates one analysis run end to end:
//!
//! - **Config**: JSON configuration with command line overrides
//! - **Beccs**: The investment model described for exploratory modeling
//! - **Analysis**: Sampling, evaluation, robustness, scenario discovery and
//!   sensitivity analysis
//! - **Report**: CSV tables, processed JSON results and a terminal summary
//!
//! ## Architecture
//!
//! ```text
//!   AnalysisConfig ──► BeccsModel ──► sample_lhs ──► policy ──► evaluate
//!                                                                  │
//!          ┌──────────────────────┬───────────────────────┬────────┤
//!          ▼                      ▼                       ▼        ▼
//!     robustness            CART scenarios            Sobol SA   raw CSV
//!          └──────────────────────┴───────────┬───────────┘
//!                                             ▼
//!                              processed results (CSV + JSON)
//! ```

pub mod analysis;
pub mod beccs;
pub mod config;
pub mod error;
pub mod report;

// Re-export main types
pub use analysis::{Analysis, AnalysisResults, RobustnessReport, ScenarioReport, SensitivityReport};
pub use beccs::BeccsModel;
pub use config::{AnalysisConfig, ConfigError, Overrides, PriceTrend};
pub use error::{AnalysisError, Result};
pub use report::{summary, write_outputs};
