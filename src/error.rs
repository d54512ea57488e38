//! Ошибки пайплайна

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Column '{0}' has no values to impute from")]
    EmptyColumn(String),

    #[error("Column '{column}' is not numeric (value '{value}')")]
    NonNumeric { column: String, value: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Scaler and model disagree on features: scaler {scaler:?}, model {model:?}")]
    SchemaMismatch {
        scaler: Vec<String>,
        model: Vec<String>,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
