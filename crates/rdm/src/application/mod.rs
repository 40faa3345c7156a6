//! Application layer: analyses over a model
//!
//! Contains:
//! - **sampling**: Latin hypercube and Monte Carlo SOW generation
//! - **evaluate**: Parallel, deterministically seeded model evaluation
//! - **robustness**: Satisficing counts and Savage regret
//! - **cart**: Scenario discovery with classification trees
//! - **sobol**: Variance-based sensitivity analysis

pub mod cart;
pub mod evaluate;
pub mod robustness;
pub mod sampling;
pub mod sobol;
