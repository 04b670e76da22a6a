//! Multinomial Logistic Regression

use crate::boosting::softmax;
use crate::error::TrainingError;
use crate::tree::normalize;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Logistic regression hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    /// Inverse L2 regularisation strength
    pub c: f64,
    /// Multiplier on the curvature-bounded step size
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Stop once every gradient component is below this
    pub tol: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            learning_rate: 1.0,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// Softmax regression fitted by full-batch gradient descent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One coefficient row per class
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    n_iter: usize,
}

impl LogisticRegression {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        params: &LinearParams,
    ) -> Result<Self, TrainingError> {
        let (n, d) = x.dim();
        if n == 0 || n != y.len() {
            return Err(TrainingError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }
        if !(params.c > 0.0) || !(params.learning_rate > 0.0) {
            return Err(TrainingError::InvalidConfig(
                "logistic regression needs positive c and learning_rate".to_string(),
            ));
        }

        let mut targets = Array2::<f64>::zeros((n, n_classes));
        for (i, &label) in y.iter().enumerate() {
            targets[[i, label]] = 1.0;
        }

        // mean loss + ||W||^2 / (2 C n)
        let reg = 1.0 / (params.c * n as f64);
        let mean_sq_norm = x.iter().map(|v| v * v).sum::<f64>() / n as f64;
        let step = params.learning_rate / (0.5 * (mean_sq_norm + 1.0) + reg);

        let mut weights = Array2::<f64>::zeros((n_classes, d));
        let mut bias = Array1::<f64>::zeros(n_classes);
        let mut n_iter = 0;
        while n_iter < params.max_iter {
            n_iter += 1;
            let mut logits = x.dot(&weights.t());
            logits += &bias;
            for mut row in logits.rows_mut() {
                let p = softmax(&row.to_vec());
                row.assign(&ArrayView1::from(&p[..]));
            }
            let residual = (logits - &targets) / n as f64;
            let grad_w = residual.t().dot(&x) + &weights * reg;
            let grad_b = residual.sum_axis(Axis(0));

            let largest = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0f64, |m, g| m.max(g.abs()));
            weights.scaled_add(-step, &grad_w);
            bias.scaled_add(-step, &grad_b);
            if largest < params.tol {
                break;
            }
        }
        debug!("Logistic regression stopped after {} iterations", n_iter);

        Ok(Self {
            coefficients: weights.rows().into_iter().map(|r| r.to_vec()).collect(),
            intercepts: bias.to_vec(),
            n_iter,
        })
    }

    /// Class probabilities for one row
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| b + w.iter().zip(row.iter()).map(|(w, v)| w * v).sum::<f64>())
            .collect();
        softmax(&logits)
    }

    /// Check that coefficient rows agree in width and count
    pub(crate) fn check_structure(&self) -> Result<(), String> {
        let width = self.n_features();
        if self.coefficients.len() != self.intercepts.len()
            || self.coefficients.iter().any(|w| w.len() != width)
        {
            return Err(format!(
                "{} coefficient rows do not match {} intercepts of width {}",
                self.coefficients.len(),
                self.intercepts.len(),
                width
            ));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    pub fn n_classes(&self) -> usize {
        self.intercepts.len()
    }

    /// Gradient steps taken
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Per-class coefficients
    pub fn coefficients(&self) -> &[Vec<f64>] {
        &self.coefficients
    }

    /// Mean absolute coefficient per feature, normalised to sum to 1
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features()];
        for class in &self.coefficients {
            for (total, w) in importances.iter_mut().zip(class) {
                *total += w.abs();
            }
        }
        normalize(&mut importances);
        importances
    }
}
