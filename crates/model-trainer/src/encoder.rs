//! Label Encoding

use crate::error::TrainingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bijection between label strings and contiguous class indices.
///
/// Classes are sorted lexicographically, so index semantics only depend on
/// the set of labels seen during fitting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the distinct labels
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let classes: BTreeSet<&str> = labels.iter().map(|l| l.as_ref()).collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    /// Rebuild from a persisted class list, which must be sorted and unique
    pub fn from_classes(classes: Vec<String>) -> Result<Self, TrainingError> {
        if classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TrainingError::InconsistentBundle(
                "label classes must be sorted and unique".to_string(),
            ));
        }
        Ok(Self { classes })
    }

    /// Class names by index
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is known
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Index of a label
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// Index of a label, ignoring ASCII case
    pub fn position_ignore_case(&self, label: &str) -> Option<usize> {
        self.classes
            .iter()
            .position(|c| c.eq_ignore_ascii_case(label))
    }

    /// Label of an index
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Encode every label
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, TrainingError> {
        labels
            .iter()
            .map(|l| {
                self.encode(l.as_ref())
                    .ok_or_else(|| TrainingError::UnknownLabel(l.as_ref().to_string()))
            })
            .collect()
    }
}
