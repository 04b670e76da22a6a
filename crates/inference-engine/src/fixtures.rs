//! Small trained bundles for tests

use chrono::Utc;
use data_validator::StandardScaler;
use model_trainer::{
    rank_importances, BoostingParams, CandidateSpec, LabelEncoder, ModelBundle, ModelMetadata,
};
use ndarray::Array2;

/// Bundle of `dimension` features where feature 0 separates fresh (low)
/// from spoiled (high)
pub(crate) fn bundle(dimension: usize) -> ModelBundle {
    let rows = 40;
    let x = Array2::from_shape_fn((rows, dimension), |(i, j)| {
        if j == 0 {
            if i % 2 == 0 {
                -1.0 - (i % 5) as f64 * 0.1
            } else {
                1.0 + (i % 5) as f64 * 0.1
            }
        } else {
            ((i * 7 + j * 13) % 11) as f64 / 10.0
        }
    });
    let y: Vec<usize> = (0..rows).map(|i| i % 2).collect();

    let scaler = StandardScaler::fit(x.view()).unwrap();
    let scaled = scaler.transform(x.view()).unwrap();
    let spec = CandidateSpec::GradientBoosting(BoostingParams {
        n_estimators: 5,
        ..BoostingParams::default()
    });
    let model = spec.fit(scaled.view(), &y, 2, 42).unwrap();
    let encoder = LabelEncoder::fit(&["fresh", "spoiled"]);
    let feature_names: Vec<String> = (0..dimension).map(|j| format!("raw_ch{}", j)).collect();
    let metadata = ModelMetadata {
        model_name: spec.name().to_string(),
        accuracy: 0.95,
        feature_count: dimension,
        training_date: Utc::now(),
        classes: encoder.classes().to_vec(),
        feature_names: feature_names.clone(),
        hyperparameters: spec.hyperparameters(),
        oob_score: None,
        random_seed: Some(42),
        cv_mean: Some(0.94),
        cv_std: Some(0.02),
        candidates: Vec::new(),
        feature_importance: rank_importances(&feature_names, &model.feature_importances()),
    };
    ModelBundle {
        model,
        scaler,
        encoder,
        feature_names,
        metadata,
    }
}
