//! Feature Engineering Error Types

use data_validator::ValidationError;
use thiserror::Error;

/// Errors raised while deriving features
#[derive(Debug, Clone, Error)]
pub enum FeatureError {
    /// A derived feature name is already a dataset column
    #[error("Derived feature '{0}' collides with an existing column")]
    NameCollision(String),

    /// A requested base feature is not a dataset column
    #[error("Base feature '{0}' not found in dataset")]
    UnknownColumn(String),

    /// Underlying dataset operation failed
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
