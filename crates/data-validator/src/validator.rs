//! Inference-Time Numeric Sanitisation

use crate::impute::{NEGATIVE_SENTINEL, POSITIVE_SENTINEL};
use serde::{Deserialize, Serialize};

/// Sanitisation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Replacement for NaN
    pub nan_value: f64,
    /// Replacement for `+inf`
    pub pos_inf_value: f64,
    /// Replacement for `-inf`
    pub neg_inf_value: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            nan_value: 0.0,
            pos_inf_value: POSITIVE_SENTINEL,
            neg_inf_value: NEGATIVE_SENTINEL,
        }
    }
}

/// What sanitisation replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub nan_count: usize,
    pub pos_inf_count: usize,
    pub neg_inf_count: usize,
}

impl SanitizeReport {
    /// Whether nothing had to change
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Total replaced cells
    pub fn total(&self) -> usize {
        self.nan_count + self.pos_inf_count + self.neg_inf_count
    }
}

/// Validator for inbound feature vectors
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Replace NaN and infinities in place
    pub fn sanitize(&self, values: &mut [f64]) -> SanitizeReport {
        let mut report = SanitizeReport::default();
        for v in values.iter_mut() {
            if v.is_nan() {
                *v = self.config.nan_value;
                report.nan_count += 1;
            } else if *v == f64::INFINITY {
                *v = self.config.pos_inf_value;
                report.pos_inf_count += 1;
            } else if *v == f64::NEG_INFINITY {
                *v = self.config.neg_inf_value;
                report.neg_inf_count += 1;
            }
        }
        report
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_specials() {
        let validator = Validator::default();
        let mut values = vec![1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -2.5];
        let report = validator.sanitize(&mut values);

        assert_eq!(values, vec![1.0, 0.0, 1e6, -1e6, -2.5]);
        assert_eq!(report.nan_count, 1);
        assert_eq!(report.pos_inf_count, 1);
        assert_eq!(report.neg_inf_count, 1);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_clean_input_untouched() {
        let validator = Validator::default();
        let mut values = vec![0.1; 10];
        let report = validator.sanitize(&mut values);
        assert!(report.is_clean());
        assert_eq!(values, vec![0.1; 10]);
    }
}
