//! Stratified Train/Test Splits and K-Fold Cross-Validation

use crate::error::TrainingError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices of one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Training rows, ascending
    pub train: Vec<usize>,
    /// Held-out rows, ascending
    pub test: Vec<usize>,
}

/// Group row indices by class, classes in ascending order
fn rows_by_class(y: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &class) in y.iter().enumerate() {
        groups.entry(class).or_default().push(row);
    }
    groups
}

fn require_two_classes(groups: &BTreeMap<usize, Vec<usize>>) -> Result<(), TrainingError> {
    if groups.len() < 2 {
        return Err(TrainingError::InsufficientData(format!(
            "need at least 2 classes, found {}",
            groups.len()
        )));
    }
    Ok(())
}

/// Split rows into train and test sets, preserving class proportions.
///
/// Each class contributes `round(n_c * test_fraction)` test rows; a class
/// left without train or test rows is an error.
pub fn stratified_split(
    y: &[usize],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidConfig(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    let groups = rows_by_class(y);
    require_two_classes(&groups)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (class, mut rows) in groups {
        let n_test = (rows.len() as f64 * test_fraction).round() as usize;
        if n_test == 0 || n_test >= rows.len() {
            return Err(TrainingError::InsufficientData(format!(
                "class {} has {} samples, too few for a {:.0}% test split",
                class,
                rows.len(),
                test_fraction * 100.0
            )));
        }
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

/// Shuffled stratified k-fold cross-validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedKFold {
    /// Create a splitter with `n_splits` folds
    pub fn new(n_splits: usize, seed: u64) -> Result<Self, TrainingError> {
        if n_splits < 2 {
            return Err(TrainingError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {}",
                n_splits
            )));
        }
        Ok(Self { n_splits, seed })
    }

    /// Number of folds
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Produce one split per fold; every class appears in every fold.
    pub fn split(&self, y: &[usize]) -> Result<Vec<Split>, TrainingError> {
        let groups = rows_by_class(y);
        require_two_classes(&groups)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut fold_of = vec![0usize; y.len()];
        // continue dealing where the previous class stopped so fold sizes stay even
        let mut next_fold = 0;
        for (class, mut rows) in groups {
            if rows.len() < self.n_splits {
                return Err(TrainingError::InsufficientData(format!(
                    "class {} has {} samples, fewer than {} folds",
                    class,
                    rows.len(),
                    self.n_splits
                )));
            }
            rows.shuffle(&mut rng);
            for row in rows {
                fold_of[row] = next_fold;
                next_fold = (next_fold + 1) % self.n_splits;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&row| fold_of[row] == fold);
                Split { train, test }
            })
            .collect())
    }
}
