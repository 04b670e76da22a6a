//! Per-Feature Standard Scaling

use crate::error::ValidationError;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Floor below which a feature is treated as constant
const MIN_STD_DEV: f64 = 1e-12;

/// Z-score scaler holding one (mean, std) pair per feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature means
    mean: Vec<f64>,
    /// Per-feature population standard deviations (1.0 for constant features)
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Create an unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on the rows of `x`
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, ValidationError> {
        if x.nrows() == 0 {
            return Err(ValidationError::EmptyDataset { stage: "scaling" });
        }
        let mean: Array1<f64> = x
            .mean_axis(Axis(0))
            .ok_or(ValidationError::EmptyDataset { stage: "scaling" })?;
        let scale: Vec<f64> = x
            .std_axis(Axis(0), 0.0)
            .iter()
            .map(|&s| if s.is_finite() && s > MIN_STD_DEV { s } else { 1.0 })
            .collect();
        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    /// Number of features the scaler was fitted on
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Whether `fit` has produced parameters
    pub fn is_fitted(&self) -> bool {
        !self.mean.is_empty()
    }

    /// Per-feature means
    pub fn means(&self) -> &[f64] {
        &self.mean
    }

    /// Per-feature scales
    pub fn scales(&self) -> &[f64] {
        &self.scale
    }

    /// Scale every row of `x`
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ValidationError> {
        self.check_width(x.ncols())?;
        let mut out = x.to_owned();
        for mut row in out.rows_mut() {
            for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *v = (*v - m) / s;
            }
        }
        Ok(out)
    }

    /// Scale a single feature vector
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ValidationError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }

    fn check_width(&self, width: usize) -> Result<(), ValidationError> {
        if !self.is_fitted() {
            return Err(ValidationError::NotFitted);
        }
        if width != self.dimension() {
            return Err(ValidationError::DimensionMismatch {
                expected: self.dimension(),
                actual: width,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        assert_eq!(scaler.dimension(), 2);

        let scaled = scaler.transform(x.view()).unwrap();
        for col in scaled.columns() {
            assert!(col.sum().abs() < 1e-12);
            let var = col.mapv(|v| v * v).mean().unwrap();
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_feature_uses_unit_scale() {
        let x = array![[5.0], [5.0], [5.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        assert_eq!(scaler.scales(), &[1.0]);
        assert_eq!(scaler.transform_row(&[5.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_width_checked() {
        let scaler = StandardScaler::fit(array![[1.0, 2.0], [3.0, 4.0]].view()).unwrap();
        assert!(matches!(
            scaler.transform_row(&[1.0]),
            Err(ValidationError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            StandardScaler::new().transform_row(&[1.0]),
            Err(ValidationError::NotFitted)
        ));
    }

    #[test]
    fn test_row_and_matrix_agree() {
        let x = array![[1.0, -4.0], [7.0, 2.0], [0.5, 9.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let matrix = scaler.transform(x.view()).unwrap();
        let row = scaler.transform_row(&[7.0, 2.0]).unwrap();
        assert_eq!(matrix.row(1).to_vec(), row);
    }
}
