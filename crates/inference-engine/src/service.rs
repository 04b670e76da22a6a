//! Model Service
//!
//! Holds the outcome of the startup load for the lifetime of the process.
//! A service whose bundle could not be loaded still answers health and,
//! when metadata was readable, model-info requests.

use crate::engine::{InferenceEngine, InferenceResult};
use crate::InferenceError;
use chrono::{DateTime, Utc};
use model_trainer::ModelMetadata;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use storage::{ArtifactReport, ArtifactState, LoadOutcome, ModelRegistry};
use tracing::{debug, info, warn};

/// Number of feature names listed by `model_info`
const LISTED_FEATURES: usize = 10;

fn unknown_device() -> String {
    "unknown".to_string()
}

/// Inbound prediction request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionRequest {
    pub features: Vec<f64>,
    #[serde(rename = "deviceId", default = "unknown_device")]
    pub device_id: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl PredictionRequest {
    pub fn new(features: Vec<f64>) -> Self {
        Self {
            features,
            device_id: unknown_device(),
            timestamp: 0,
        }
    }
}

/// Summary of the serving model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub accuracy: f64,
    pub feature_count: usize,
    pub training_date: DateTime<Utc>,
    pub classes: Vec<String>,
    /// First few feature names
    pub feature_names: Vec<String>,
}

impl From<&ModelMetadata> for ModelInfo {
    fn from(metadata: &ModelMetadata) -> Self {
        Self {
            model_name: metadata.model_name.clone(),
            accuracy: metadata.accuracy,
            feature_count: metadata.feature_count,
            training_date: metadata.training_date,
            classes: metadata.classes.clone(),
            feature_names: metadata
                .feature_names
                .iter()
                .take(LISTED_FEATURES)
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
}

/// Health snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub timestamp: DateTime<Utc>,
    /// Artifact name → loaded
    pub models_loaded: BTreeMap<String, bool>,
    /// Model accuracy, or "unavailable" without metadata
    #[serde(serialize_with = "accuracy_or_unavailable")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn accuracy_or_unavailable<S: Serializer>(
    accuracy: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match accuracy {
        Some(value) => serializer.serialize_f64(*value),
        None => serializer.serialize_str("unavailable"),
    }
}

#[derive(Debug)]
enum ServiceState {
    Ready(InferenceEngine),
    Degraded {
        report: ArtifactReport,
        reason: String,
        metadata: Option<ModelMetadata>,
    },
}

/// Immutable model state shared by every request handler
#[derive(Debug)]
pub struct ModelService {
    state: ServiceState,
}

impl ModelService {
    /// Load the bundle in `registry` once
    pub fn load(registry: &ModelRegistry) -> Self {
        info!("Loading model bundle from {}", registry.dir().display());
        Self::from_outcome(registry.load())
    }

    /// Build the service from a registry load outcome
    pub fn from_outcome(outcome: LoadOutcome) -> Self {
        let state = match outcome {
            LoadOutcome::Ready(bundle) => {
                let metadata = bundle.metadata.clone();
                match InferenceEngine::new(bundle) {
                    Ok(engine) => {
                        info!(
                            "Serving {} ({} features, accuracy {:.4})",
                            metadata.model_name, metadata.feature_count, metadata.accuracy
                        );
                        ServiceState::Ready(engine)
                    }
                    Err(e) => ServiceState::Degraded {
                        report: ArtifactReport::uniform(ArtifactState::Loaded),
                        reason: e.to_string(),
                        metadata: Some(metadata),
                    },
                }
            }
            LoadOutcome::Absent => ServiceState::Degraded {
                report: ArtifactReport::uniform(ArtifactState::Missing),
                reason: "no model bundle found".to_string(),
                metadata: None,
            },
            LoadOutcome::Incomplete {
                report,
                reason,
                metadata,
            } => ServiceState::Degraded {
                report,
                reason,
                metadata,
            },
        };
        if let ServiceState::Degraded { reason, .. } = &state {
            warn!("Model service degraded: {}", reason);
        }
        Self { state }
    }

    /// Serve an already validated bundle
    pub fn from_engine(engine: InferenceEngine) -> Self {
        Self {
            state: ServiceState::Ready(engine),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    pub fn engine(&self) -> Option<&InferenceEngine> {
        match &self.state {
            ServiceState::Ready(engine) => Some(engine),
            ServiceState::Degraded { .. } => None,
        }
    }

    /// Metadata of the bundle, when readable
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        match &self.state {
            ServiceState::Ready(engine) => Some(&engine.bundle().metadata),
            ServiceState::Degraded { metadata, .. } => metadata.as_ref(),
        }
    }

    /// Per-artifact load states
    pub fn report(&self) -> ArtifactReport {
        match &self.state {
            ServiceState::Ready(_) => ArtifactReport::uniform(ArtifactState::Loaded),
            ServiceState::Degraded { report, .. } => report.clone(),
        }
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<InferenceResult, InferenceError> {
        match &self.state {
            ServiceState::Ready(engine) => {
                debug!(
                    "Prediction request from {} at {} with {} features",
                    request.device_id,
                    request.timestamp,
                    request.features.len()
                );
                engine.predict(&request.features)
            }
            ServiceState::Degraded { reason, .. } => {
                Err(InferenceError::ServiceUnavailable(reason.clone()))
            }
        }
    }

    pub fn model_info(&self) -> Result<ModelInfo, InferenceError> {
        self.metadata()
            .map(ModelInfo::from)
            .ok_or(InferenceError::MetadataUnavailable)
    }

    pub fn health(&self) -> HealthReport {
        let models_loaded = self
            .report()
            .iter()
            .map(|(artifact, state)| (artifact.key().to_string(), *state == ArtifactState::Loaded))
            .collect();
        let (status, reason) = match &self.state {
            ServiceState::Ready(_) => (ServiceStatus::Healthy, None),
            ServiceState::Degraded { reason, .. } => (ServiceStatus::Degraded, Some(reason.clone())),
        };
        HealthReport {
            status,
            timestamp: Utc::now(),
            models_loaded,
            accuracy: self.metadata().map(|m| m.accuracy),
            reason,
        }
    }
}
