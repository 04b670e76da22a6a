//! Training Error Types

use data_validator::ValidationError;
use thiserror::Error;

/// Errors raised while fitting and selecting models
#[derive(Debug, Clone, Error)]
pub enum TrainingError {
    /// Not enough classes or samples to train and evaluate
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A label was not seen when the encoder was fitted
    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    /// Matrix width or length does not match the model
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Training configuration cannot be used
    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),

    /// Bundle parts disagree with each other
    #[error("Inconsistent model bundle: {0}")]
    InconsistentBundle(String),

    /// Dataset or scaler failure
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
