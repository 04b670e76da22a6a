//! Freshness and Shelf-Life Scoring
//!
//! Maps a classifier decision onto the freshness score and remaining shelf
//! life reported to devices. The mapping is fixed product policy:
//!
//! | decision | freshness          | shelf life (h)      |
//! |----------|--------------------|---------------------|
//! | fresh    | 0.7 + 0.3·P(fresh) | 48 + 24·P(fresh)    |
//! | other    | 0.3·P(spoiled)     | 12·P(spoiled)       |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class index assumed for "fresh" when the encoder has no such class
pub const FALLBACK_FRESH_INDEX: usize = 1;
/// Class index assumed for "spoiled" when the encoder has no such class
pub const FALLBACK_SPOILED_INDEX: usize = 0;

/// Reported quality label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessLabel {
    Fresh,
    Spoiled,
}

impl fmt::Display for FreshnessLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreshnessLabel::Fresh => f.write_str("fresh"),
            FreshnessLabel::Spoiled => f.write_str("spoiled"),
        }
    }
}

/// Scored outcome of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FreshnessScore {
    pub freshness: f64,
    pub shelf_life_hours: f64,
    /// Largest class probability
    pub confidence: f64,
    pub label: FreshnessLabel,
}

/// Scorer bound to the class positions of one label encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessScorer {
    fresh_index: usize,
    spoiled_index: usize,
}

impl FreshnessScorer {
    pub fn new(fresh_index: usize, spoiled_index: usize) -> Self {
        Self {
            fresh_index,
            spoiled_index,
        }
    }

    /// Locate "fresh" and "spoiled" by case-insensitive name, falling back to
    /// indices 1 and 0. A fallback never lands on the class already matched
    /// by name; it moves to the first other class instead.
    pub fn from_classes<S: AsRef<str>>(classes: &[S]) -> Self {
        let find = |name: &str| {
            classes
                .iter()
                .position(|c| c.as_ref().eq_ignore_ascii_case(name))
        };
        let other_than = |taken: usize, fallback: usize| {
            if fallback != taken {
                fallback
            } else {
                (0..classes.len()).find(|&i| i != taken).unwrap_or(fallback)
            }
        };
        let (fresh_index, spoiled_index) = match (find("fresh"), find("spoiled")) {
            (Some(fresh), Some(spoiled)) => (fresh, spoiled),
            (Some(fresh), None) => (fresh, other_than(fresh, FALLBACK_SPOILED_INDEX)),
            (None, Some(spoiled)) => (other_than(spoiled, FALLBACK_FRESH_INDEX), spoiled),
            (None, None) => (FALLBACK_FRESH_INDEX, FALLBACK_SPOILED_INDEX),
        };
        Self {
            fresh_index,
            spoiled_index,
        }
    }

    pub fn fresh_index(&self) -> usize {
        self.fresh_index
    }

    pub fn spoiled_index(&self) -> usize {
        self.spoiled_index
    }

    /// Score a decision; out-of-range probabilities are clamped to [0, 1]
    pub fn score(&self, predicted: usize, probabilities: &[f64]) -> FreshnessScore {
        let p_fresh = probability(probabilities, self.fresh_index);
        let p_spoiled = probability(probabilities, self.spoiled_index);
        let confidence = probabilities
            .iter()
            .map(|&p| clamp_unit(p))
            .fold(0.0, f64::max);

        if predicted == self.fresh_index {
            FreshnessScore {
                freshness: 0.7 + 0.3 * p_fresh,
                shelf_life_hours: 48.0 + 24.0 * p_fresh,
                confidence,
                label: FreshnessLabel::Fresh,
            }
        } else {
            FreshnessScore {
                freshness: 0.3 * p_spoiled,
                shelf_life_hours: 12.0 * p_spoiled,
                confidence,
                label: FreshnessLabel::Spoiled,
            }
        }
    }
}

fn clamp_unit(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

fn probability(probabilities: &[f64], index: usize) -> f64 {
    probabilities.get(index).map_or(0.0, |&p| clamp_unit(p))
}
