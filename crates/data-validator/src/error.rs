//! Validation Error Types

use thiserror::Error;

/// Errors during dataset loading, cleaning and scaling
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The configured label column is not present in the table
    #[error("Label column '{0}' not found")]
    MissingLabelColumn(String),

    /// No usable rows remain
    #[error("No usable rows remain after {stage}")]
    EmptyDataset { stage: &'static str },

    /// A row does not have one cell per column
    #[error("Row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A column name appears twice
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// A requested column does not exist
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Input vector or matrix has the wrong width
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Scaler used before being fitted
    #[error("Scaler is not fitted")]
    NotFitted,

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Underlying file could not be read
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ValidationError {
    fn from(err: std::io::Error) -> Self {
        ValidationError::Io(err.to_string())
    }
}

impl From<csv::Error> for ValidationError {
    fn from(err: csv::Error) -> Self {
        ValidationError::InvalidFormat(err.to_string())
    }
}
