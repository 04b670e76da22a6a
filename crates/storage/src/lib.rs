//! Storage Layer
//!
//! Persists trained model bundles as five artifact files in a model
//! directory, replaced atomically on every save.

mod artifact;
mod registry;

pub use artifact::{Artifact, ArtifactReport, ArtifactState};
pub use registry::{LoadOutcome, ModelRegistry};

use model_trainer::TrainingError;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Refusing to replace {dir:?}: it holds non-bundle entries {entries:?}")]
    ForeignEntries {
        dir: std::path::PathBuf,
        entries: Vec<String>,
    },
    #[error("Refusing to save inconsistent bundle: {0}")]
    InvalidBundle(#[from] TrainingError),
}
