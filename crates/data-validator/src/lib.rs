//! Data Validation and Cleaning
//!
//! Turns raw spectral sensor rows into a dense, finite dataset for training,
//! sanitises feature vectors at inference time, and provides the standard scaler
//! shared by both sides.

mod error;
mod impute;
mod normalizer;
mod preprocessor;
mod source;
mod table;
mod validator;

pub use error::ValidationError;
pub use impute::{bound_infinite, median, NEGATIVE_SENTINEL, POSITIVE_SENTINEL};
pub use normalizer::StandardScaler;
pub use preprocessor::{CleanedData, PreprocessConfig, PreprocessReport, Preprocessor};
pub use source::{load_csv, load_csv_files, read_csv};
pub use table::{Dataset, RawTable};
pub use validator::{SanitizeReport, ValidationConfig, Validator};
