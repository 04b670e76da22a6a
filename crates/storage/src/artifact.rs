//! Bundle Artifacts and Their Load State

use serde::Serialize;
use std::fmt;

/// One file of a persisted bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Classifier,
    Scaler,
    LabelEncoder,
    FeatureNames,
    Metadata,
}

impl Artifact {
    /// Every artifact, in load order
    pub const ALL: [Artifact; 5] = [
        Artifact::Classifier,
        Artifact::Scaler,
        Artifact::LabelEncoder,
        Artifact::FeatureNames,
        Artifact::Metadata,
    ];

    /// File name inside the model directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::Classifier => "classifier.bin",
            Artifact::Scaler => "scaler.json",
            Artifact::LabelEncoder => "label_encoder.json",
            Artifact::FeatureNames => "feature_names.json",
            Artifact::Metadata => "model_metadata.json",
        }
    }

    /// Short name used in reports
    pub fn key(&self) -> &'static str {
        match self {
            Artifact::Classifier => "classifier",
            Artifact::Scaler => "scaler",
            Artifact::LabelEncoder => "label_encoder",
            Artifact::FeatureNames => "feature_names",
            Artifact::Metadata => "metadata",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What happened when an artifact was read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactState {
    Loaded,
    Missing,
    Corrupt { reason: String },
}

/// Load state of every artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    states: Vec<(Artifact, ArtifactState)>,
}

impl Default for ArtifactReport {
    fn default() -> Self {
        Self::uniform(ArtifactState::Missing)
    }
}

impl ArtifactReport {
    /// Report with every artifact in the same state
    pub fn uniform(state: ArtifactState) -> Self {
        Self {
            states: Artifact::ALL.iter().map(|&a| (a, state.clone())).collect(),
        }
    }

    pub(crate) fn set(&mut self, artifact: Artifact, state: ArtifactState) {
        if let Some(entry) = self.states.iter_mut().find(|(a, _)| *a == artifact) {
            entry.1 = state;
        }
    }

    /// State of one artifact
    pub fn state(&self, artifact: Artifact) -> &ArtifactState {
        self.states
            .iter()
            .find(|(a, _)| *a == artifact)
            .map(|(_, s)| s)
            .unwrap_or(&ArtifactState::Missing)
    }

    pub fn is_loaded(&self, artifact: Artifact) -> bool {
        *self.state(artifact) == ArtifactState::Loaded
    }

    /// Whether every artifact loaded
    pub fn all_loaded(&self) -> bool {
        self.states.iter().all(|(_, s)| *s == ArtifactState::Loaded)
    }

    /// Whether no artifact file exists
    pub fn all_missing(&self) -> bool {
        self.states.iter().all(|(_, s)| *s == ArtifactState::Missing)
    }

    /// Artifacts with their states, in load order
    pub fn iter(&self) -> impl Iterator<Item = (Artifact, &ArtifactState)> {
        self.states.iter().map(|(a, s)| (*a, s))
    }

    /// One-line description of the artifacts that did not load
    pub fn summary(&self) -> String {
        let problems: Vec<String> = self
            .iter()
            .filter_map(|(artifact, state)| match state {
                ArtifactState::Loaded => None,
                ArtifactState::Missing => Some(format!("{} missing", artifact)),
                ArtifactState::Corrupt { reason } => {
                    Some(format!("{} corrupt ({})", artifact, reason))
                }
            })
            .collect();
        if problems.is_empty() {
            "all artifacts loaded".to_string()
        } else {
            problems.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_states() {
        let mut report = ArtifactReport::default();
        assert!(report.all_missing());
        report.set(Artifact::Classifier, ArtifactState::Loaded);
        report.set(
            Artifact::Scaler,
            ArtifactState::Corrupt {
                reason: "bad json".into(),
            },
        );
        assert!(report.is_loaded(Artifact::Classifier));
        assert!(!report.all_loaded());
        assert!(!report.all_missing());
        assert_eq!(
            report.summary(),
            "scaler corrupt (bad json), label_encoder missing, feature_names missing, metadata missing"
        );
    }

    #[test]
    fn test_file_names() {
        let names: Vec<&str> = Artifact::ALL.iter().map(Artifact::file_name).collect();
        assert_eq!(
            names,
            vec![
                "classifier.bin",
                "scaler.json",
                "label_encoder.json",
                "feature_names.json",
                "model_metadata.json"
            ]
        );
    }

    #[test]
    fn test_state_json() {
        let json = serde_json::to_string(&ArtifactState::Missing).unwrap();
        assert_eq!(json, r#"{"state":"missing"}"#);
    }
}
