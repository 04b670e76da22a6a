//! Weighted CART Decision Trees
//!
//! Trees are stored as a flat node arena with the root at index 0. The same
//! builder grows Gini classification trees for the forests and variance
//! regression trees for gradient boosting.

use crate::error::TrainingError;
use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index::sample;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Smallest impurity decrease accepted for a split
const MIN_GAIN: f64 = 1e-12;

/// How split thresholds are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Splitter {
    /// Best threshold among all midpoints
    Best,
    /// One uniform random threshold per candidate feature
    Random,
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per node (`None` = all)
    pub max_features: Option<usize>,
    pub splitter: Splitter,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            splitter: Splitter::Best,
        }
    }
}

/// What the tree is fitted against
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Class indices below `n_classes`; leaves hold class probabilities
    Classes { labels: &'a [usize], n_classes: usize },
    /// Continuous values; leaves hold the weighted mean
    Values(&'a [f64]),
}

impl Target<'_> {
    fn len(&self) -> usize {
        match self {
            Target::Classes { labels, .. } => labels.len(),
            Target::Values(values) => values.len(),
        }
    }

    fn n_classes(&self) -> usize {
        match self {
            Target::Classes { n_classes, .. } => *n_classes,
            Target::Values(_) => 0,
        }
    }
}

/// One node of the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Weighted impurity decrease of this split
        gain: f64,
    },
}

/// Weighted target statistics of a set of rows
#[derive(Debug, Clone)]
struct NodeStats {
    weight: f64,
    class_weight: Vec<f64>,
    sum: f64,
    sum_sq: f64,
}

impl NodeStats {
    fn new(n_classes: usize) -> Self {
        Self {
            weight: 0.0,
            class_weight: vec![0.0; n_classes],
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    fn collect(target: &Target<'_>, weights: &[f64], rows: &[usize]) -> Self {
        let mut stats = Self::new(target.n_classes());
        for &row in rows {
            stats.add(target, row, weights[row]);
        }
        stats
    }

    fn add(&mut self, target: &Target<'_>, row: usize, w: f64) {
        self.weight += w;
        match target {
            Target::Classes { labels, .. } => self.class_weight[labels[row]] += w,
            Target::Values(values) => {
                self.sum += w * values[row];
                self.sum_sq += w * values[row] * values[row];
            }
        }
    }

    fn remove(&mut self, target: &Target<'_>, row: usize, w: f64) {
        self.add(target, row, -w);
    }

    /// Gini impurity for classes, variance for values
    fn impurity(&self) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        if self.class_weight.is_empty() {
            let mean = self.sum / self.weight;
            (self.sum_sq / self.weight - mean * mean).max(0.0)
        } else {
            let sum_sq: f64 = self
                .class_weight
                .iter()
                .map(|c| (c / self.weight) * (c / self.weight))
                .sum();
            (1.0 - sum_sq).max(0.0)
        }
    }

    fn weighted_impurity(&self) -> f64 {
        self.weight * self.impurity()
    }

    fn leaf_value(&self) -> Vec<f64> {
        if self.class_weight.is_empty() {
            let mean = if self.weight > 0.0 {
                self.sum / self.weight
            } else {
                0.0
            };
            vec![mean]
        } else if self.weight > 0.0 {
            self.class_weight.iter().map(|c| c / self.weight).collect()
        } else {
            vec![0.0; self.class_weight.len()]
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on the rows of `x` with non-zero weight.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        target: Target<'_>,
        weights: &[f64],
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self, TrainingError> {
        if x.nrows() != target.len() || x.nrows() != weights.len() {
            return Err(TrainingError::DimensionMismatch {
                expected: x.nrows(),
                actual: target.len().min(weights.len()),
            });
        }
        let rows: Vec<usize> = (0..x.nrows()).filter(|&r| weights[r] > 0.0).collect();
        if rows.is_empty() || x.ncols() == 0 {
            return Err(TrainingError::InsufficientData(
                "tree needs at least one weighted row and one feature".to_string(),
            ));
        }

        let builder = Builder {
            x: x.reborrow(),
            target,
            weights,
            params,
            min_leaf: params.min_samples_leaf.max(1),
        };
        let mut nodes = Vec::new();
        let mut pending = vec![(0usize, rows, 0usize)];
        nodes.push(TreeNode::Leaf { value: Vec::new() });

        while let Some((id, rows, depth)) = pending.pop() {
            let stats = NodeStats::collect(&target, weights, &rows);
            nodes[id] = TreeNode::Leaf {
                value: stats.leaf_value(),
            };
            if !builder.can_split(&stats, rows.len(), depth) {
                continue;
            }
            let Some(best) = builder.best_split(&rows, &stats, rng) else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| x[[r, best.feature]] <= best.threshold);
            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf { value: Vec::new() });
            nodes.push(TreeNode::Leaf { value: Vec::new() });
            nodes[id] = TreeNode::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
                gain: best.gain,
            };
            pending.push((right, right_rows, depth + 1));
            pending.push((left, left_rows, depth + 1));
        }

        Ok(Self {
            nodes,
            n_features: x.ncols(),
        })
    }

    /// Number of input features
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf (root alone = 0)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match &self.nodes[id] {
                TreeNode::Leaf { .. } => deepest = deepest.max(depth),
                TreeNode::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        deepest
    }

    /// Index of the leaf a row falls into
    pub fn leaf_index(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                TreeNode::Leaf { .. } => return id,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Leaf value for a row: class probabilities or a single regression value
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        match &self.nodes[self.leaf_index(row)] {
            TreeNode::Leaf { value } => value,
            TreeNode::Split { .. } => &[],
        }
    }

    /// Replace the value of a leaf
    pub(crate) fn set_leaf_value(&mut self, id: usize, value: Vec<f64>) {
        if let Some(TreeNode::Leaf { value: current }) = self.nodes.get_mut(id) {
            *current = value;
        }
    }

    /// Check feature indices, child links and leaf widths of a tree read
    /// from disk. Children always sit after their parent in the arena.
    pub(crate) fn check_structure(&self, n_features: usize, outputs: usize) -> Result<(), String> {
        if self.n_features != n_features {
            return Err(format!(
                "tree expects {} features, model has {}",
                self.n_features, n_features
            ));
        }
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } if value.len() != outputs => {
                    return Err(format!(
                        "leaf {} holds {} values, expected {}",
                        id,
                        value.len(),
                        outputs
                    ));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", id, feature));
                    }
                    for &child in [left, right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(format!("node {} links to invalid child {}", id, child));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Mean decrease in impurity per feature, normalised to sum to 1
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        for node in &self.nodes {
            if let TreeNode::Split { feature, gain, .. } = node {
                importances[*feature] += gain;
            }
        }
        normalize(&mut importances);
        importances
    }
}

/// Scale values to sum to 1; all-zero input stays zero
pub(crate) fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 && total.is_finite() {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

struct Builder<'a> {
    x: ArrayView2<'a, f64>,
    target: Target<'a>,
    weights: &'a [f64],
    params: &'a TreeParams,
    min_leaf: usize,
}

impl Builder<'_> {
    fn can_split(&self, stats: &NodeStats, n_rows: usize, depth: usize) -> bool {
        if self.params.max_depth.is_some_and(|max| depth >= max) {
            return false;
        }
        n_rows >= self.params.min_samples_split.max(2)
            && n_rows >= 2 * self.min_leaf
            && stats.impurity() > MIN_GAIN
    }

    fn best_split(
        &self,
        rows: &[usize],
        stats: &NodeStats,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = self.x.ncols();
        let k = self
            .params
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features);
        let features: Vec<usize> = if k == n_features {
            (0..n_features).collect()
        } else {
            sample(rng, n_features, k).into_vec()
        };

        let parent = stats.weighted_impurity();
        let mut best: Option<SplitCandidate> = None;
        for feature in features {
            let candidate = match self.params.splitter {
                Splitter::Best => self.best_threshold(rows, feature, stats, parent),
                Splitter::Random => self.random_threshold(rows, feature, parent, rng),
            };
            if let Some(c) = candidate {
                if c.gain > MIN_GAIN && best.map_or(true, |b| c.gain > b.gain) {
                    best = Some(c);
                }
            }
        }
        best
    }

    fn best_threshold(
        &self,
        rows: &[usize],
        feature: usize,
        stats: &NodeStats,
        parent: f64,
    ) -> Option<SplitCandidate> {
        let mut sorted: Vec<(f64, usize)> =
            rows.iter().map(|&r| (self.x[[r, feature]], r)).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut left = NodeStats::new(self.target.n_classes());
        let mut right = stats.clone();
        let mut best: Option<SplitCandidate> = None;
        for i in 0..sorted.len() - 1 {
            let (value, row) = sorted[i];
            let w = self.weights[row];
            left.add(&self.target, row, w);
            right.remove(&self.target, row, w);

            let next = sorted[i + 1].0;
            if next <= value {
                continue;
            }
            let n_left = i + 1;
            if n_left < self.min_leaf || sorted.len() - n_left < self.min_leaf {
                continue;
            }
            let gain = parent - left.weighted_impurity() - right.weighted_impurity();
            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(value, next),
                    gain,
                });
            }
        }
        best
    }

    fn random_threshold(
        &self,
        rows: &[usize],
        feature: usize,
        parent: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
            let v = self.x[[r, feature]];
            (lo.min(v), hi.max(v))
        });
        if !(hi > lo) {
            return None;
        }
        let threshold = rng.gen_range(lo..hi);

        let n_classes = self.target.n_classes();
        let mut left = NodeStats::new(n_classes);
        let mut right = NodeStats::new(n_classes);
        let mut n_left = 0;
        for &row in rows {
            if self.x[[row, feature]] <= threshold {
                left.add(&self.target, row, self.weights[row]);
                n_left += 1;
            } else {
                right.add(&self.target, row, self.weights[row]);
            }
        }
        if n_left < self.min_leaf || rows.len() - n_left < self.min_leaf {
            return None;
        }
        Some(SplitCandidate {
            feature,
            threshold,
            gain: parent - left.weighted_impurity() - right.weighted_impurity(),
        })
    }
}

/// Threshold between two distinct sorted values that keeps `lo` on the left
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo / 2.0 + hi / 2.0;
    if mid >= hi || mid < lo {
        lo
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_separates_two_classes() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [10.0, 0.0], [11.0, 0.0], [12.0, 0.0]];
        let y = [0, 0, 0, 1, 1, 1];
        let tree = DecisionTree::fit(
            x.view(),
            Target::Classes { labels: &y, n_classes: 2 },
            &[1.0; 6],
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(array![2.5, 0.0].view()), &[1.0, 0.0]);
        assert_eq!(tree.predict_row(array![11.5, 0.0].view()), &[0.0, 1.0]);
        assert_eq!(tree.feature_importances(), vec![1.0, 0.0]);
        // midpoint between 3 and 10
        assert!(matches!(tree.nodes[0], TreeNode::Split { threshold, .. } if threshold == 6.5));
    }

    #[test]
    fn test_structure_check_rejects_bad_links() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [10.0, 0.0], [11.0, 0.0]];
        let y = [0, 0, 1, 1];
        let mut tree = DecisionTree::fit(
            x.view(),
            Target::Classes { labels: &y, n_classes: 2 },
            &[1.0; 4],
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();
        assert!(tree.check_structure(2, 2).is_ok());
        assert!(tree.check_structure(3, 2).is_err());
        assert!(tree.check_structure(2, 1).is_err());

        let TreeNode::Split { threshold, gain, .. } = tree.nodes[0].clone() else {
            panic!("expected a root split");
        };
        tree.nodes[0] = TreeNode::Split {
            feature: 0,
            threshold,
            left: 1,
            right: 99,
            gain,
        };
        assert!(tree.check_structure(2, 2).unwrap_err().contains("child 99"));

        tree.nodes[0] = TreeNode::Split {
            feature: 0,
            threshold,
            left: 0,
            right: 2,
            gain,
        };
        assert!(tree.check_structure(2, 2).is_err());

        tree.nodes[0] = TreeNode::Split {
            feature: 7,
            threshold,
            left: 1,
            right: 2,
            gain,
        };
        assert!(tree.check_structure(2, 2).unwrap_err().contains("feature 7"));
    }

    #[test]
    fn test_weights_shift_leaf_probabilities() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = [0, 1, 1];
        let tree = DecisionTree::fit(
            x.view(),
            Target::Classes { labels: &y, n_classes: 2 },
            &[2.0, 1.0, 0.0],
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();
        let p = tree.predict_row(array![1.0].view());
        assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p[1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_depth_and_min_leaf() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]];
        let y = [0, 1, 0, 1, 0, 1, 0, 1];
        let params = TreeParams {
            max_depth: Some(2),
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(
            x.view(),
            Target::Classes { labels: &y, n_classes: 2 },
            &[1.0; 8],
            &params,
            &mut rng(),
        )
        .unwrap();
        assert!(tree.depth() <= 2);

        let params = TreeParams {
            min_samples_leaf: 4,
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(
            x.view(),
            Target::Classes { labels: &y, n_classes: 2 },
            &[1.0; 8],
            &params,
            &mut rng(),
        )
        .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_regression_leaves_hold_means() {
        let x = array![[0.0], [1.0], [10.0], [11.0]];
        let values = [1.0, 3.0, 10.0, 12.0];
        let params = TreeParams {
            max_depth: Some(1),
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(
            x.view(),
            Target::Values(&values),
            &[1.0; 4],
            &params,
            &mut rng(),
        )
        .unwrap();
        assert_eq!(tree.predict_row(array![0.5].view()), &[2.0]);
        assert_eq!(tree.predict_row(array![10.5].view()), &[11.0]);
    }

    #[test]
    fn test_random_splitter_is_seeded() {
        let x = array![[0.0, 5.0], [1.0, 4.0], [2.0, 3.0], [3.0, 2.0], [4.0, 1.0], [5.0, 0.0]];
        let y = [0, 0, 0, 1, 1, 1];
        let params = TreeParams {
            splitter: Splitter::Random,
            max_features: Some(1),
            ..TreeParams::default()
        };
        let fit = |seed| {
            DecisionTree::fit(
                x.view(),
                Target::Classes { labels: &y, n_classes: 2 },
                &[1.0; 6],
                &params,
                &mut ChaCha8Rng::seed_from_u64(seed),
            )
            .unwrap()
        };
        assert_eq!(fit(3), fit(3));
        // fully grown random trees still fit the training rows
        let tree = fit(3);
        for (row, &label) in x.rows().into_iter().zip(&y) {
            assert_eq!(tree.predict_row(row)[label], 1.0);
        }
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = [0, 1, 0, 1];
        let tree = DecisionTree::fit(
            x.view(),
            Target::Classes { labels: &y, n_classes: 2 },
            &[1.0; 4],
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.feature_importances(), vec![0.0]);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(midpoint(1.0, 2.0), 1.5);
        let lo: f64 = 1.0;
        let hi = f64::from_bits(lo.to_bits() + 1);
        assert_eq!(midpoint(lo, hi), lo);
    }
}
