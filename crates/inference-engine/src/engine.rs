//! Inference Engine Implementation

use crate::aligner::{Alignment, InferenceAligner};
use crate::scorer::{FreshnessLabel, FreshnessScorer};
use crate::InferenceError;
use data_validator::{SanitizeReport, ValidationConfig, Validator};
use model_trainer::{argmax, FeatureImportance, ModelBundle};
use serde::{Serialize, Serializer};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Number of global importances attached to each prediction
const TOP_IMPORTANCES: usize = 10;

/// Prediction returned to devices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub freshness_prediction: f64,
    pub shelf_life_hours: f64,
    pub confidence: f64,
    /// Held-out accuracy of the serving model
    pub model_accuracy: f64,
    pub prediction_label: FreshnessLabel,
    /// Most important features first, serialised as a name → weight map
    #[serde(serialize_with = "importance_map")]
    pub feature_importance: Vec<FeatureImportance>,
}

fn importance_map<S: Serializer>(
    importances: &[FeatureImportance],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(importances.iter().map(|f| (&f.feature, f.importance)))
}

/// Result of inference operation
#[derive(Debug, Clone)]
pub struct InferenceResult {
    pub prediction: Prediction,
    /// How the input was fitted to the model dimension
    pub alignment: Alignment,
    /// Non-finite input values that were replaced
    pub sanitized: SanitizeReport,
    pub latency_us: u64,
}

/// Runs predictions against one validated bundle
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    bundle: ModelBundle,
    aligner: InferenceAligner,
    validator: Validator,
    scorer: FreshnessScorer,
    importances: Vec<FeatureImportance>,
}

impl InferenceEngine {
    /// Wrap a bundle, rejecting one whose parts disagree
    pub fn new(bundle: ModelBundle) -> Result<Self, InferenceError> {
        bundle
            .validate()
            .map_err(|e| InferenceError::ServiceUnavailable(e.to_string()))?;
        let aligner = InferenceAligner::new(bundle.dimension());
        let scorer = FreshnessScorer::from_classes(bundle.encoder.classes());
        let importances = bundle.top_importances(TOP_IMPORTANCES);
        debug!(
            "Inference engine ready: {} features, fresh class {}, spoiled class {}",
            bundle.dimension(),
            scorer.fresh_index(),
            scorer.spoiled_index()
        );
        Ok(Self {
            bundle,
            aligner,
            validator: Validator::default(),
            scorer,
            importances,
        })
    }

    /// Replace the non-finite value substitutes
    pub fn with_validation(mut self, config: ValidationConfig) -> Self {
        self.validator = Validator::new(config);
        self
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn scorer(&self) -> &FreshnessScorer {
        &self.scorer
    }

    /// Predict freshness for one raw feature vector of any length
    pub fn predict(&self, features: &[f64]) -> Result<InferenceResult, InferenceError> {
        let start = Instant::now();
        let result = self.run(features, start);
        match &result {
            Ok(_) => metrics::counter!("lacteva_predictions_total").increment(1),
            Err(e) => {
                error!("Prediction failed: {}", e);
                metrics::counter!("lacteva_prediction_failures_total").increment(1);
            }
        }
        result
    }

    fn run(&self, features: &[f64], start: Instant) -> Result<InferenceResult, InferenceError> {
        let (mut aligned, alignment) = self.aligner.align(features);
        match alignment {
            Alignment::Exact => {}
            Alignment::Padded { .. } => {
                metrics::counter!("lacteva_alignment_corrections_total", "kind" => "padded")
                    .increment(1)
            }
            Alignment::Truncated { .. } => {
                metrics::counter!("lacteva_alignment_corrections_total", "kind" => "truncated")
                    .increment(1)
            }
        }

        let sanitized = self.validator.sanitize(&mut aligned);
        if !sanitized.is_clean() {
            warn!(
                "Replaced non-finite inputs: {} NaN, {} +inf, {} -inf",
                sanitized.nan_count, sanitized.pos_inf_count, sanitized.neg_inf_count
            );
            metrics::counter!("lacteva_sanitized_values_total").increment(sanitized.total() as u64);
        }

        let scaled = self
            .bundle
            .scaler
            .transform_row(&aligned)
            .map_err(|e| InferenceError::PredictionFailed(e.to_string()))?;
        let probabilities = self
            .bundle
            .model
            .predict_proba_row(&scaled)
            .map_err(|e| InferenceError::PredictionFailed(e.to_string()))?;
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::PredictionFailed(
                "model produced non-finite probabilities".to_string(),
            ));
        }

        let predicted = argmax(&probabilities);
        let score = self.scorer.score(predicted, &probabilities);
        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            "Predicted class {} ({}) with confidence {:.3} in {}us",
            predicted, score.label, score.confidence, latency_us
        );

        Ok(InferenceResult {
            prediction: Prediction {
                freshness_prediction: score.freshness,
                shelf_life_hours: score.shelf_life_hours,
                confidence: score.confidence,
                model_accuracy: self.bundle.metadata.accuracy,
                prediction_label: score.label,
                feature_importance: self.importances.clone(),
            },
            alignment,
            sanitized,
            latency_us,
        })
    }
}
