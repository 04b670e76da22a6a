//! Statistical Features Computation

/// Aggregate statistics across the channels of one group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticalFeatures {
    /// Sum of all channels
    pub sum: f64,
    /// Mean value
    pub mean: f64,
    /// Sample standard deviation (0 for fewer than two channels)
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Position of the first maximum
    pub argmax: usize,
    /// Mean first difference between neighbouring channels
    pub slope: f64,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let sum: f64 = values.iter().sum();
        let mean = sum / n;

        let mut min = values[0];
        let mut max = values[0];
        let mut argmax = 0;
        for (i, &v) in values.iter().enumerate().skip(1) {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
                argmax = i;
            }
        }

        // ddof = 1 to match the sample statistics used when the models were designed
        let std_dev = if values.len() >= 2 {
            let m2: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (m2 / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        let slope = if values.len() >= 2 {
            let total: f64 = values.windows(2).map(|w| w[1] - w[0]).sum();
            total / (values.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            sum,
            mean,
            std_dev,
            min,
            max,
            argmax,
            slope,
        }
    }

    /// Spread between the largest and smallest channel
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_sum() {
        let stats = StatisticalFeatures::compute(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert!((stats.sum - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_dev() {
        let stats = StatisticalFeatures::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        // sum of squared deviations is 32 over 7 degrees of freedom
        assert!((stats.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_peak_and_range() {
        let stats = StatisticalFeatures::compute(&[3.0, 9.0, 1.0, 9.0]);
        assert_eq!(stats.argmax, 1);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.range(), 8.0);
    }

    #[test]
    fn test_slope() {
        let stats = StatisticalFeatures::compute(&[1.0, 3.0, 2.0, 6.0]);
        assert!((stats.slope - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_and_empty() {
        let single = StatisticalFeatures::compute(&[4.0]);
        assert_eq!(single.std_dev, 0.0);
        assert_eq!(single.slope, 0.0);
        assert_eq!(single.range(), 0.0);

        let empty = StatisticalFeatures::compute(&[]);
        assert_eq!(empty.mean, 0.0);
    }
}
