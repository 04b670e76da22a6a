//! Classification Metrics

use serde::{Deserialize, Serialize};

/// Fraction of predictions equal to the truth (0 for empty input)
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Counts indexed by `[actual][predicted]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        let mut counts = vec![vec![0; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < n_classes && p < n_classes {
                counts[t][p] += 1;
            }
        }
        Self { counts }
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts
            .get(actual)
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0)
    }

    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Per-class precision, recall and F1
    pub fn report(&self, classes: &[String]) -> Vec<ClassReport> {
        (0..self.n_classes())
            .map(|c| {
                let tp = self.get(c, c) as f64;
                let predicted: usize = (0..self.n_classes()).map(|a| self.get(a, c)).sum();
                let support: usize = self.counts[c].iter().sum();
                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                ClassReport {
                    class: classes.get(c).cloned().unwrap_or_else(|| c.to_string()),
                    precision,
                    recall,
                    f1: ratio(2.0 * precision * recall, precision + recall),
                    support,
                }
            })
            .collect()
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Held-out metrics of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert!((accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]) - 0.75).abs() < 1e-12);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_confusion_and_report() {
        let y_true = [0, 0, 0, 1, 1];
        let y_pred = [0, 0, 1, 1, 1];
        let cm = ConfusionMatrix::new(&y_true, &y_pred, 2);
        assert_eq!(cm.rows(), &[vec![2, 1], vec![0, 2]]);

        let report = cm.report(&["fresh".to_string(), "spoiled".to_string()]);
        assert_eq!(report[0].class, "fresh");
        assert!((report[0].precision - 1.0).abs() < 1e-12);
        assert!((report[0].recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((report[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report[1].support, 2);
        assert!((report[0].f1 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_unpredicted_class_has_zero_precision() {
        let cm = ConfusionMatrix::new(&[0, 1], &[0, 0], 2);
        let report = cm.report(&[]);
        assert_eq!(report[1].precision, 0.0);
        assert_eq!(report[1].f1, 0.0);
        assert_eq!(report[1].class, "1");
    }

    #[test]
    fn test_mean_std() {
        let (mean, std) = mean_std(&[0.8, 1.0]);
        assert!((mean - 0.9).abs() < 1e-12);
        assert!((std - 0.1).abs() < 1e-12);
    }
}
