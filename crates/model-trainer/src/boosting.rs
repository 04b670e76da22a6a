//! Gradient Boosted Trees for Classification
//!
//! Binary problems boost a single log-odds score; more than two classes boost
//! one score per class under the multinomial deviance. Leaf values take one
//! Newton step on the loss.

use crate::error::TrainingError;
use crate::tree::{normalize, DecisionTree, Splitter, Target, TreeParams};
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Denominator floor for the Newton step
const MIN_HESSIAN: f64 = 1e-12;

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Fitted gradient boosting classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    /// Initial raw score per output (log-odds or log-prior)
    init: Vec<f64>,
    /// One tree per output per stage
    stages: Vec<Vec<DecisionTree>>,
    learning_rate: f64,
    n_features: usize,
    n_classes: usize,
}

impl GradientBoosting {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        params: &BoostingParams,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(TrainingError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }
        if n_classes < 2 {
            return Err(TrainingError::InsufficientData(
                "boosting needs at least 2 classes".to_string(),
            ));
        }
        if !(params.learning_rate > 0.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                params.learning_rate
            )));
        }

        let mut counts = vec![0usize; n_classes];
        for &label in y {
            counts[label] += 1;
        }
        let prior: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64 / n as f64).clamp(MIN_HESSIAN, 1.0 - MIN_HESSIAN))
            .collect();
        let init = if n_classes == 2 {
            vec![(prior[1] / (1.0 - prior[1])).ln()]
        } else {
            prior.iter().map(|p| p.ln()).collect()
        };
        let n_outputs = init.len();

        let tree_params = TreeParams {
            max_depth: Some(params.max_depth),
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
            splitter: Splitter::Best,
        };
        let unit_weights = vec![1.0; n];
        let mut raw = Array2::<f64>::zeros((n, n_outputs));
        for mut row in raw.rows_mut() {
            row.assign(&ArrayView1::from(&init[..]));
        }

        let mut model = Self {
            init,
            stages: Vec::with_capacity(params.n_estimators),
            learning_rate: params.learning_rate,
            n_features: x.ncols(),
            n_classes,
        };

        for stage in 0..params.n_estimators {
            let proba = model.raw_to_proba_matrix(&raw);
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(stage as u64));
            let mut trees = Vec::with_capacity(n_outputs);
            for k in 0..n_outputs {
                // binary problems track the positive class only
                let class = if n_outputs == 1 { 1 } else { k };
                let residual: Vec<f64> = (0..n)
                    .map(|i| f64::from(u8::from(y[i] == class)) - proba[[i, class]])
                    .collect();
                let mut tree = DecisionTree::fit(
                    x,
                    Target::Values(&residual),
                    &unit_weights,
                    &tree_params,
                    &mut rng,
                )?;

                let mut leaves: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
                for i in 0..n {
                    let p = proba[[i, class]];
                    let entry = leaves.entry(tree.leaf_index(x.row(i))).or_default();
                    entry.0 += residual[i];
                    entry.1 += p * (1.0 - p);
                }
                let scale = if n_outputs == 1 {
                    1.0
                } else {
                    (n_classes as f64 - 1.0) / n_classes as f64
                };
                let mut steps = BTreeMap::new();
                for (leaf, (numerator, denominator)) in leaves {
                    let step = if denominator.abs() < MIN_HESSIAN {
                        0.0
                    } else {
                        scale * numerator / denominator
                    };
                    tree.set_leaf_value(leaf, vec![step]);
                    steps.insert(leaf, step);
                }
                for i in 0..n {
                    if let Some(step) = steps.get(&tree.leaf_index(x.row(i))) {
                        raw[[i, k]] += params.learning_rate * step;
                    }
                }
                trees.push(tree);
            }
            model.stages.push(trees);
        }

        debug!(
            "Boosted {} stages x {} outputs",
            model.stages.len(),
            n_outputs
        );
        Ok(model)
    }

    fn raw_score(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut raw = self.init.clone();
        for stage in &self.stages {
            for (score, tree) in raw.iter_mut().zip(stage) {
                *score += self.learning_rate * tree.predict_row(row).first().copied().unwrap_or(0.0);
            }
        }
        raw
    }

    fn raw_to_proba(&self, raw: &[f64]) -> Vec<f64> {
        if self.n_classes == 2 {
            let p = sigmoid(raw[0]);
            vec![1.0 - p, p]
        } else {
            softmax(raw)
        }
    }

    fn raw_to_proba_matrix(&self, raw: &Array2<f64>) -> Array2<f64> {
        let mut proba = Array2::zeros((raw.nrows(), self.n_classes));
        for (i, row) in raw.rows().into_iter().enumerate() {
            for (k, p) in self.raw_to_proba(&row.to_vec()).into_iter().enumerate() {
                proba[[i, k]] = p;
            }
        }
        proba
    }

    /// Class probabilities for one row
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        self.raw_to_proba(&self.raw_score(row))
    }

    /// Check stage widths and every tree against the model's dimensions
    pub(crate) fn check_structure(&self) -> Result<(), String> {
        let outputs = if self.n_classes == 2 { 1 } else { self.n_classes };
        if self.n_classes < 2 || self.init.len() != outputs {
            return Err(format!(
                "boosting model has {} initial scores for {} classes",
                self.init.len(),
                self.n_classes
            ));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.len() != outputs {
                return Err(format!(
                    "stage {} holds {} trees, expected {}",
                    i,
                    stage.len(),
                    outputs
                ));
            }
            for tree in stage {
                tree.check_structure(self.n_features, 1)?;
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of boosting stages
    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    /// Impurity importances averaged over every tree
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        for tree in self.stages.iter().flatten() {
            for (total, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *total += v;
            }
        }
        normalize(&mut importances);
        importances
    }
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Softmax with the maximum subtracted first
pub(crate) fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = z.iter().map(|v| (v - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}
