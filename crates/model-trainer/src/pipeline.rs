//! End-to-End Training Pipeline
//!
//! Chains loading, cleaning, feature engineering, label encoding and model
//! selection into a validated `ModelBundle`, naming the stage that failed.

use crate::bundle::{rank_importances, ModelBundle, ModelMetadata};
use crate::encoder::LabelEncoder;
use crate::error::TrainingError;
use crate::metrics::ClassReport;
use crate::selector::{ModelTrainer, TrainingConfig};
use chrono::Utc;
use data_validator::{
    load_csv_files, PreprocessConfig, PreprocessReport, Preprocessor, RawTable, ValidationError,
};
use feature_engine::{EngineeringConfig, FeatureEngineer, FeatureError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Pipeline stage, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Preprocess,
    Engineer,
    Train,
    Persist,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Load => "load",
            PipelineStage::Preprocess => "preprocess",
            PipelineStage::Engineer => "engineer",
            PipelineStage::Train => "train",
            PipelineStage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A training run failure
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("load stage failed: {0}")]
    Load(#[source] ValidationError),

    #[error("preprocess stage failed: {0}")]
    Preprocess(#[source] ValidationError),

    #[error("engineer stage failed: {0}")]
    Engineer(#[source] FeatureError),

    #[error("train stage failed: {0}")]
    Train(#[source] TrainingError),

    /// Writing the bundle failed
    #[error("persist stage failed: {0}")]
    Persist(String),
}

impl PipelineError {
    /// Stage that failed
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Load(_) => PipelineStage::Load,
            PipelineError::Preprocess(_) => PipelineStage::Preprocess,
            PipelineError::Engineer(_) => PipelineStage::Engineer,
            PipelineError::Train(_) => PipelineStage::Train,
            PipelineError::Persist(_) => PipelineStage::Persist,
        }
    }
}

/// Configuration of every stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub engineering: EngineeringConfig,
    pub training: TrainingConfig,
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub bundle: ModelBundle,
    pub preprocess: PreprocessReport,
    /// Winner's per-class held-out metrics
    pub class_reports: Vec<ClassReport>,
}

/// Runs the full offline training flow
#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load headered CSV files and train on their union
    pub fn run_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<TrainingRun, PipelineError> {
        let table = load_csv_files(paths, &self.config.preprocess.label_column)
            .map_err(PipelineError::Load)?;
        self.run(&table)
    }

    /// Train on an in-memory table
    pub fn run(&self, table: &RawTable) -> Result<TrainingRun, PipelineError> {
        let cleaned = Preprocessor::new(self.config.preprocess.clone())
            .clean(table)
            .map_err(PipelineError::Preprocess)?;

        let engineered = FeatureEngineer::new(self.config.engineering.clone())
            .engineer(cleaned.dataset, &cleaned.feature_columns)
            .map_err(PipelineError::Engineer)?;
        let x = engineered
            .feature_matrix()
            .map_err(PipelineError::Engineer)?;

        let encoder = LabelEncoder::fit(&engineered.dataset.labels);
        if encoder.len() < 2 {
            return Err(PipelineError::Train(TrainingError::InsufficientData(
                format!("need at least 2 classes, found {:?}", encoder.classes()),
            )));
        }
        let y = encoder
            .transform(&engineered.dataset.labels)
            .map_err(PipelineError::Train)?;

        let training = &self.config.training;
        let outcome = ModelTrainer::new(training.clone())
            .train(x.view(), &y, encoder.len())
            .map_err(PipelineError::Train)?;

        let winner = outcome.winner().clone();
        let feature_names = engineered.feature_names;
        let metadata = ModelMetadata {
            model_name: winner.name.clone(),
            accuracy: winner.accuracy,
            feature_count: feature_names.len(),
            training_date: Utc::now(),
            classes: encoder.classes().to_vec(),
            feature_names: feature_names.clone(),
            hyperparameters: outcome.spec.hyperparameters(),
            oob_score: winner.oob_score,
            random_seed: Some(training.seed),
            cv_mean: Some(winner.cv_mean),
            cv_std: Some(winner.cv_std),
            candidates: outcome.evaluations.clone(),
            feature_importance: rank_importances(
                &feature_names,
                &outcome.model.feature_importances(),
            ),
        };
        let class_reports = outcome.confusion.report(encoder.classes());
        let bundle = ModelBundle {
            model: outcome.model,
            scaler: outcome.scaler,
            encoder,
            feature_names,
            metadata,
        };
        bundle.validate().map_err(PipelineError::Train)?;

        info!(
            "Trained {} on {} features: accuracy {:.4}",
            bundle.metadata.model_name,
            bundle.dimension(),
            bundle.metadata.accuracy
        );
        Ok(TrainingRun {
            bundle,
            preprocess: cleaned.report,
            class_reports,
        })
    }
}
