//! Model Bundle and Metadata

use crate::encoder::LabelEncoder;
use crate::error::TrainingError;
use crate::model::Classifier;
use crate::selector::CandidateEvaluation;
use chrono::{DateTime, Utc};
use data_validator::StandardScaler;
use serde::{Deserialize, Serialize};

/// Importance of one named feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Rank features by descending importance; ties keep feature order
pub fn rank_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Description of a trained model, persisted as `model_metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    /// Held-out accuracy of the selected model
    pub accuracy: f64,
    pub feature_count: usize,
    pub training_date: DateTime<Utc>,
    pub classes: Vec<String>,
    pub feature_names: Vec<String>,
    pub hyperparameters: serde_json::Value,
    #[serde(default)]
    pub oob_score: Option<f64>,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub cv_mean: Option<f64>,
    #[serde(default)]
    pub cv_std: Option<f64>,
    /// Every candidate of the run, in roster order
    #[serde(default)]
    pub candidates: Vec<CandidateEvaluation>,
    /// Global importances, most important first
    #[serde(default)]
    pub feature_importance: Vec<FeatureImportance>,
}

/// Everything needed to serve predictions
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub model: Classifier,
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
    pub feature_names: Vec<String>,
    pub metadata: ModelMetadata,
}

impl ModelBundle {
    /// Check that the parts agree on dimension and classes
    pub fn validate(&self) -> Result<(), TrainingError> {
        self.model.check_structure()?;
        let n = self.feature_names.len();
        let checks = [
            (self.scaler.dimension() == n, "scaler dimension"),
            (self.model.n_features() == n, "model input dimension"),
            (self.metadata.feature_count == n, "metadata feature_count"),
            (self.metadata.feature_names == self.feature_names, "metadata feature_names"),
            (self.metadata.classes == self.encoder.classes(), "metadata classes"),
            (self.model.n_classes() == self.encoder.len(), "model class count"),
        ];
        for (ok, what) in checks {
            if !ok {
                return Err(TrainingError::InconsistentBundle(format!(
                    "{} disagrees with {} feature names / {} classes",
                    what,
                    n,
                    self.encoder.len()
                )));
            }
        }
        if n == 0 || self.encoder.len() < 2 {
            return Err(TrainingError::InconsistentBundle(
                "bundle needs features and at least 2 classes".to_string(),
            ));
        }
        Ok(())
    }

    /// Input dimension expected at inference
    pub fn dimension(&self) -> usize {
        self.feature_names.len()
    }

    /// The `k` most important features
    pub fn top_importances(&self, k: usize) -> Vec<FeatureImportance> {
        if self.metadata.feature_importance.is_empty() {
            let mut ranked =
                rank_importances(&self.feature_names, &self.model.feature_importances());
            ranked.truncate(k);
            ranked
        } else {
            self.metadata
                .feature_importance
                .iter()
                .take(k)
                .cloned()
                .collect()
        }
    }
}
