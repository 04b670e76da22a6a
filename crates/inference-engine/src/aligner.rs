//! Feature Vector Length Alignment

use serde::Serialize;
use tracing::warn;

/// How an inbound vector was fitted to the model dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alignment {
    Exact,
    /// Zeros appended at the end
    Padded { added: usize },
    /// Trailing values dropped
    Truncated { removed: usize },
}

impl Alignment {
    pub fn is_exact(&self) -> bool {
        matches!(self, Alignment::Exact)
    }
}

/// Pads or truncates feature vectors to the bundle dimension.
///
/// Values keep their positions; nothing is reordered or renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceAligner {
    expected: usize,
}

impl InferenceAligner {
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }

    /// Dimension every output has
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Fit `features` to exactly `expected` values
    pub fn align(&self, features: &[f64]) -> (Vec<f64>, Alignment) {
        let received = features.len();
        let mut aligned: Vec<f64> = features.iter().take(self.expected).copied().collect();

        let alignment = if received < self.expected {
            aligned.resize(self.expected, 0.0);
            warn!("Padded features from {} to {}", received, self.expected);
            Alignment::Padded {
                added: self.expected - received,
            }
        } else if received > self.expected {
            warn!("Truncated features from {} to {}", received, self.expected);
            Alignment::Truncated {
                removed: received - self.expected,
            }
        } else {
            Alignment::Exact
        };
        (aligned, alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_vector_is_zero_padded() {
        let (aligned, alignment) = InferenceAligner::new(47).align(&[0.1; 10]);
        assert_eq!(aligned.len(), 47);
        assert!(aligned[..10].iter().all(|&v| v == 0.1));
        assert!(aligned[10..].iter().all(|&v| v == 0.0));
        assert_eq!(alignment, Alignment::Padded { added: 37 });
    }

    #[test]
    fn test_long_vector_is_truncated() {
        let (aligned, alignment) = InferenceAligner::new(3).align(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(aligned, vec![1.0, 2.0, 3.0]);
        assert_eq!(alignment, Alignment::Truncated { removed: 2 });
    }

    #[test]
    fn test_exact_vector_is_untouched() {
        let (aligned, alignment) = InferenceAligner::new(2).align(&[f64::NAN, 7.0]);
        assert!(aligned[0].is_nan());
        assert_eq!(aligned[1], 7.0);
        assert!(alignment.is_exact());
    }

    #[test]
    fn test_empty_vector() {
        let (aligned, _) = InferenceAligner::new(4).align(&[]);
        assert_eq!(aligned, vec![0.0; 4]);
    }

    proptest! {
        #[test]
        fn prop_output_has_expected_length(
            features in proptest::collection::vec(-1e3f64..1e3, 0..80),
            expected in 1usize..60,
        ) {
            let (aligned, _) = InferenceAligner::new(expected).align(&features);
            prop_assert_eq!(aligned.len(), expected);
            let kept = features.len().min(expected);
            prop_assert_eq!(&aligned[..kept], &features[..kept]);
            prop_assert!(aligned[kept..].iter().all(|&v| v == 0.0));
        }
    }
}
