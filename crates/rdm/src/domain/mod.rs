//! Domain layer: model description, uncertainties and evaluated data

mod dataset;
mod model;
mod query;
mod uncertainty;

pub use dataset::{ColumnSummary, DataSet, Record};
pub use model::{Direction, Lever, LeverKind, Model, ModelSpec, Parameter, Response};
pub use query::{CmpOp, Operand, Query};
pub use uncertainty::{Distribution, Uncertainty};
