//! Candidate Training and Model Selection

use crate::error::TrainingError;
use crate::metrics::{accuracy, mean_std, ConfusionMatrix};
use crate::model::{Classifier, CandidateSpec};
use crate::split::{stratified_split, StratifiedKFold};
use data_validator::StandardScaler;
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Training protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed for the split, the folds and every candidate
    pub seed: u64,
    /// Held-out fraction per class
    pub test_fraction: f64,
    /// Stratified cross-validation folds on the training split
    pub cv_folds: usize,
    /// Candidates, in tie-break order
    pub roster: Vec<CandidateSpec>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            cv_folds: 5,
            roster: CandidateSpec::default_roster(),
        }
    }
}

/// Scores of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub name: String,
    /// Held-out accuracy
    pub accuracy: f64,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub cv_scores: Vec<f64>,
    pub oob_score: Option<f64>,
    /// Wall-clock seconds to fit on the training split
    pub fit_seconds: f64,
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Winning model, fitted on the scaled training split
    pub model: Classifier,
    /// The winner's strategy
    pub spec: CandidateSpec,
    /// Scaler fitted on the training split
    pub scaler: StandardScaler,
    /// Every candidate, in roster order
    pub evaluations: Vec<CandidateEvaluation>,
    /// Position of the winner in `evaluations`
    pub selected: usize,
    /// Winner's confusion matrix on the held-out split
    pub confusion: ConfusionMatrix,
}

impl TrainingOutcome {
    /// Winner's evaluation
    pub fn winner(&self) -> &CandidateEvaluation {
        &self.evaluations[self.selected]
    }
}

/// Fits every roster candidate on the same partition and keeps the best
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train and select a model for features `x` and encoded labels `y`.
    ///
    /// Candidates are ranked by held-out accuracy, then cross-validation
    /// mean; remaining ties keep roster order.
    pub fn train(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<TrainingOutcome, TrainingError> {
        if x.nrows() != y.len() {
            return Err(TrainingError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if self.config.roster.is_empty() {
            return Err(TrainingError::InvalidConfig(
                "candidate roster is empty".to_string(),
            ));
        }
        let seed = self.config.seed;

        let split = stratified_split(y, self.config.test_fraction, seed)?;
        let y_train: Vec<usize> = split.train.iter().map(|&r| y[r]).collect();
        let y_test: Vec<usize> = split.test.iter().map(|&r| y[r]).collect();
        let scaler = StandardScaler::fit(x.select(Axis(0), &split.train).view())?;
        let x_train = scaler.transform(x.select(Axis(0), &split.train).view())?;
        let x_test = scaler.transform(x.select(Axis(0), &split.test).view())?;
        let folds = StratifiedKFold::new(self.config.cv_folds, seed)?.split(&y_train)?;

        info!(
            "Training {} candidates on {} rows ({} held out, {} folds)",
            self.config.roster.len(),
            split.train.len(),
            split.test.len(),
            folds.len()
        );

        let mut best: Option<(usize, Classifier, Vec<usize>)> = None;
        let mut evaluations = Vec::with_capacity(self.config.roster.len());
        for (idx, spec) in self.config.roster.iter().enumerate() {
            let mut cv_scores = Vec::with_capacity(folds.len());
            for fold in &folds {
                let fold_y: Vec<usize> = fold.train.iter().map(|&r| y_train[r]).collect();
                let model = spec.fit(
                    x_train.select(Axis(0), &fold.train).view(),
                    &fold_y,
                    n_classes,
                    seed,
                )?;
                let predicted = model.predict(x_train.select(Axis(0), &fold.test).view())?;
                let truth: Vec<usize> = fold.test.iter().map(|&r| y_train[r]).collect();
                cv_scores.push(accuracy(&truth, &predicted));
            }
            let (cv_mean, cv_std) = mean_std(&cv_scores);

            let started = Instant::now();
            let model = spec.fit(x_train.view(), &y_train, n_classes, seed)?;
            let fit_seconds = started.elapsed().as_secs_f64();
            let predicted = model.predict(x_test.view())?;
            let evaluation = CandidateEvaluation {
                name: spec.name().to_string(),
                accuracy: accuracy(&y_test, &predicted),
                cv_mean,
                cv_std,
                cv_scores,
                oob_score: model.oob_score(),
                fit_seconds,
            };
            debug!(
                "{}: accuracy {:.4}, cv {:.4} +/- {:.4}, oob {:?}",
                evaluation.name,
                evaluation.accuracy,
                evaluation.cv_mean,
                evaluation.cv_std,
                evaluation.oob_score
            );

            let better = match &best {
                None => true,
                Some((current, _, _)) => {
                    let incumbent: &CandidateEvaluation = &evaluations[*current];
                    evaluation.accuracy > incumbent.accuracy
                        || (evaluation.accuracy == incumbent.accuracy
                            && evaluation.cv_mean > incumbent.cv_mean)
                }
            };
            evaluations.push(evaluation);
            if better {
                best = Some((idx, model, predicted));
            }
        }

        let (selected, model, predicted) = best.ok_or_else(|| {
            TrainingError::InvalidConfig("no candidate was trained".to_string())
        })?;
        let confusion = ConfusionMatrix::new(&y_test, &predicted, n_classes);
        info!(
            "Selected {} with held-out accuracy {:.4}",
            evaluations[selected].name, evaluations[selected].accuracy
        );

        Ok(TrainingOutcome {
            model,
            spec: self.config.roster[selected].clone(),
            scaler,
            evaluations,
            selected,
            confusion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosting::BoostingParams;
    use crate::forest::ForestParams;
    use crate::linear::LinearParams;
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn blobs(n_per_class: usize, n_classes: usize) -> (Array2<f64>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = n_per_class * n_classes;
        let mut x = Array2::zeros((n, 3));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let class = i % n_classes;
            x[[i, 0]] = class as f64 * 5.0 + rng.gen_range(-1.0..1.0);
            x[[i, 1]] = 100.0 + rng.gen_range(-10.0..10.0);
            x[[i, 2]] = rng.gen_range(0.0..1.0);
            y.push(class);
        }
        (x, y)
    }

    fn quick_config(seed: u64) -> TrainingConfig {
        TrainingConfig {
            seed,
            roster: vec![
                CandidateSpec::RandomForest(ForestParams {
                    n_estimators: 10,
                    ..ForestParams::random_forest()
                }),
                CandidateSpec::ExtraTrees(ForestParams {
                    n_estimators: 10,
                    ..ForestParams::extra_trees()
                }),
                CandidateSpec::GradientBoosting(BoostingParams {
                    n_estimators: 10,
                    ..BoostingParams::default()
                }),
                CandidateSpec::LogisticRegression(LinearParams {
                    max_iter: 200,
                    ..LinearParams::default()
                }),
            ],
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_trains_every_candidate() {
        let (x, y) = blobs(25, 2);
        let outcome = ModelTrainer::new(quick_config(42))
            .train(x.view(), &y, 2)
            .unwrap();

        assert_eq!(outcome.evaluations.len(), 4);
        assert!(outcome.evaluations[0].oob_score.is_some());
        assert!(outcome.evaluations[1].oob_score.is_none());
        for eval in &outcome.evaluations {
            assert_eq!(eval.cv_scores.len(), 5);
        }
        assert!(outcome.winner().accuracy > 0.9);
        assert_eq!(outcome.model.family(), outcome.winner().name);
        assert_eq!(outcome.scaler.dimension(), 3);
        let tested: usize = outcome.confusion.rows().iter().flatten().sum();
        assert_eq!(tested, 10);
    }

    #[test]
    fn test_ties_keep_roster_order() {
        // all candidates separate these blobs perfectly
        let (x, y) = blobs(25, 2);
        let outcome = ModelTrainer::new(quick_config(42))
            .train(x.view(), &y, 2)
            .unwrap();
        let best = &outcome.evaluations[outcome.selected];
        for (i, eval) in outcome.evaluations.iter().enumerate() {
            assert!(eval.accuracy <= best.accuracy);
            if i < outcome.selected {
                assert!(
                    eval.accuracy < best.accuracy
                        || (eval.accuracy == best.accuracy && eval.cv_mean < best.cv_mean)
                );
            }
        }
    }

    #[test]
    fn test_same_seed_same_selection() {
        let (x, y) = blobs(20, 3);
        let trainer = ModelTrainer::new(quick_config(7));
        let a = trainer.train(x.view(), &y, 3).unwrap();
        let b = trainer.train(x.view(), &y, 3).unwrap();

        assert_eq!(a.selected, b.selected);
        assert_eq!(a.model, b.model);
        assert_eq!(a.model.feature_importances(), b.model.feature_importances());
        for (ea, eb) in a.evaluations.iter().zip(&b.evaluations) {
            assert_eq!(ea.accuracy, eb.accuracy);
            assert_eq!(ea.cv_scores, eb.cv_scores);
        }
    }

    #[test]
    fn test_insufficient_data() {
        let (x, _) = blobs(10, 2);
        let y = vec![0; 20];
        assert!(matches!(
            ModelTrainer::default().train(x.view(), &y, 1),
            Err(TrainingError::InsufficientData(_))
        ));

        // 4 spoiled rows leave only 3 for training: fewer than 5 folds
        let (x, mut y) = blobs(20, 2);
        let mut seen = 0;
        for label in y.iter_mut() {
            if *label == 1 {
                seen += 1;
                if seen > 4 {
                    *label = 0;
                }
            }
        }
        assert!(matches!(
            ModelTrainer::new(quick_config(1)).train(x.view(), &y, 2),
            Err(TrainingError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_empty_roster_rejected() {
        let (x, y) = blobs(10, 2);
        let config = TrainingConfig {
            roster: Vec::new(),
            ..TrainingConfig::default()
        };
        assert!(matches!(
            ModelTrainer::new(config).train(x.view(), &y, 2),
            Err(TrainingError::InvalidConfig(_))
        ));
    }
}
