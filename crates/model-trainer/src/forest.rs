//! Random Forest and Extremely Randomized Trees

use crate::error::TrainingError;
use crate::tree::{normalize, DecisionTree, Splitter, Target, TreeParams};
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    /// Resolve against the feature count (at least 1)
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// `n_samples / (n_classes * count_c)`
    Balanced,
}

impl ClassWeight {
    /// Weight of each class for the labels `y`
    pub fn weights(&self, y: &[usize], n_classes: usize) -> Vec<f64> {
        match self {
            ClassWeight::Uniform => vec![1.0; n_classes],
            ClassWeight::Balanced => {
                let mut counts = vec![0usize; n_classes];
                for &label in y {
                    counts[label] += 1;
                }
                counts
                    .iter()
                    .map(|&c| {
                        if c == 0 {
                            0.0
                        } else {
                            y.len() as f64 / (n_classes as f64 * c as f64)
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    /// Estimate accuracy on out-of-bag rows (needs `bootstrap`)
    pub oob_score: bool,
}

impl ForestParams {
    /// Bagged Gini trees with balanced class weights
    pub fn random_forest() -> Self {
        Self {
            n_estimators: 200,
            max_depth: Some(15),
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            oob_score: true,
        }
    }

    /// Fully grown randomized-threshold trees on the whole training set
    pub fn extra_trees() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: false,
            class_weight: ClassWeight::Uniform,
            oob_score: false,
        }
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::random_forest()
    }
}

/// Ensemble of decision trees voting by mean class probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    oob_score: Option<f64>,
    importances: Vec<f64>,
}

impl Forest {
    /// Fit the ensemble. Tree `t` draws from its own RNG seeded with `seed + t`.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
        splitter: Splitter,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(TrainingError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }
        if params.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig(
                "forest needs at least one tree".to_string(),
            ));
        }

        let class_weights = params.class_weight.weights(y, n_classes);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(params.max_features.resolve(x.ncols())),
            splitter,
        };
        let target = Target::Classes {
            labels: y,
            n_classes,
        };
        let track_oob = params.bootstrap && params.oob_score;
        let mut oob_proba = Array2::<f64>::zeros((n, n_classes));
        let mut oob_votes = vec![0usize; n];

        let mut trees = Vec::with_capacity(params.n_estimators);
        for t in 0..params.n_estimators {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(t as u64));
            let mut counts = vec![1usize; n];
            if params.bootstrap {
                counts = vec![0; n];
                for _ in 0..n {
                    counts[rng.gen_range(0..n)] += 1;
                }
            }
            let weights: Vec<f64> = counts
                .iter()
                .zip(y)
                .map(|(&c, &label)| c as f64 * class_weights[label])
                .collect();

            let tree = DecisionTree::fit(x, target, &weights, &tree_params, &mut rng)?;
            if track_oob {
                for row in (0..n).filter(|&r| counts[r] == 0) {
                    for (k, p) in tree.predict_row(x.row(row)).iter().enumerate() {
                        oob_proba[[row, k]] += p;
                    }
                    oob_votes[row] += 1;
                }
            }
            trees.push(tree);
        }

        let oob_score = if track_oob {
            let scored: Vec<usize> = (0..n).filter(|&r| oob_votes[r] > 0).collect();
            if scored.is_empty() {
                None
            } else {
                let correct = scored
                    .iter()
                    .filter(|&&r| crate::model::argmax(&oob_proba.row(r).to_vec()) == y[r])
                    .count();
                Some(correct as f64 / scored.len() as f64)
            }
        } else {
            None
        };

        let mut importances = vec![0.0; x.ncols()];
        for tree in &trees {
            for (total, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *total += v;
            }
        }
        normalize(&mut importances);

        debug!(
            "Fitted {} trees ({:?} splitter), oob score {:?}",
            trees.len(),
            splitter,
            oob_score
        );

        Ok(Self {
            trees,
            n_features: x.ncols(),
            n_classes,
            oob_score,
            importances,
        })
    }

    /// Mean class probabilities over all trees
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in proba.iter_mut().zip(tree.predict_row(row)) {
                *total += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }

    /// Check every tree against the forest's dimensions
    pub(crate) fn check_structure(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.importances.len() != self.n_features {
            return Err(format!(
                "forest holds {} importances for {} features",
                self.importances.len(),
                self.n_features
            ));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.check_structure(self.n_features, self.n_classes))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Out-of-bag accuracy, when bootstrapping with OOB scoring
    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score
    }

    /// Mean decrease in impurity averaged over trees
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}
