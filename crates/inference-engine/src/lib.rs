//! Freshness Inference
//!
//! Serves predictions from a loaded model bundle: aligns inbound feature
//! vectors to the bundle dimension, sanitises non-finite values, scales,
//! classifies and maps the decision to freshness and shelf life.

mod aligner;
mod engine;
mod scorer;
mod service;

#[cfg(test)]
mod fixtures;

pub use aligner::{Alignment, InferenceAligner};
pub use engine::{InferenceEngine, InferenceResult, Prediction};
pub use scorer::{
    FreshnessLabel, FreshnessScore, FreshnessScorer, FALLBACK_FRESH_INDEX, FALLBACK_SPOILED_INDEX,
};
pub use service::{HealthReport, ModelInfo, ModelService, PredictionRequest, ServiceStatus};

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),
    #[error("Model metadata unavailable")]
    MetadataUnavailable,
}
