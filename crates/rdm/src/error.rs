//! Exploratory modeling errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RdmError {
    #[error("Invalid model specification: {0}")]
    InvalidSpec(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Query error at position {position}: {message}")]
    Query { position: usize, message: String },

    #[error("Evaluation failed for SOW {index}: {source}")]
    Evaluation {
        index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Sensitivity analysis failed: {0}")]
    Sensitivity(String),

    #[error("CSV error at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RdmError>;
