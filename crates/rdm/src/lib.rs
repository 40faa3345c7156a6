//! Exploratory modeling toolkit for robust decision making
//!
//! Describe a model's uncertainties, levers and responses, sample states of
//! the world, evaluate the model over them in parallel, then analyze the
//! resulting ensemble: satisficing and regret, scenario discovery with
//! classification trees, and Sobol sensitivity indices.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export key types at crate root
pub use application::cart::{Cart, CartConfig, Rule, RuleOp, ScenarioNode};
pub use application::evaluate::{evaluate, evaluate_sequential, sow_rng};
pub use application::robustness::{
    RegretSummary, min_max_regret, regret_summary, satisficing_count, satisficing_share,
};
pub use application::sampling::{sample_lhs, sample_uniform, update};
pub use application::sobol::{GroupIndices, SobolConfig, SobolIndices, SobolResult, saltelli_sample};
pub use domain::{
    ColumnSummary, DataSet, Direction, Distribution, Lever, LeverKind, Model, ModelSpec, Parameter,
    Query, Record, Response, Uncertainty,
};
pub use error::{RdmError, Result};
pub use infrastructure::{load_csv, save_csv};
