//! Model Directory Registry

use crate::artifact::{Artifact, ArtifactReport, ArtifactState};
use crate::StorageError;
use data_validator::StandardScaler;
use model_trainer::{Classifier, LabelEncoder, ModelBundle, ModelMetadata};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of reading a model directory
#[derive(Debug)]
pub enum LoadOutcome {
    /// All artifacts loaded and agree with each other
    Ready(ModelBundle),
    /// No artifact exists
    Absent,
    /// Some artifacts are missing or unreadable, or they disagree
    Incomplete {
        report: ArtifactReport,
        reason: String,
        /// Metadata, when it could be read
        metadata: Option<ModelMetadata>,
    },
}

impl LoadOutcome {
    /// Per-artifact states
    pub fn report(&self) -> ArtifactReport {
        match self {
            LoadOutcome::Ready(_) => ArtifactReport::uniform(ArtifactState::Loaded),
            LoadOutcome::Absent => ArtifactReport::uniform(ArtifactState::Missing),
            LoadOutcome::Incomplete { report, .. } => report.clone(),
        }
    }
}

/// Reads and writes bundles in one model directory.
///
/// The directory belongs to the registry: a save replaces it wholesale.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    dir: PathBuf,
}

impl ModelRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Model directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write all five artifacts, replacing any previous bundle.
    ///
    /// Files are written and synced in a staging directory beside the
    /// target, which is then renamed into place. A target holding anything
    /// besides bundle artifacts is left untouched and the save fails.
    pub fn save(&self, bundle: &ModelBundle) -> Result<(), StorageError> {
        bundle.validate()?;
        self.check_replaceable()?;

        let parent = match self.dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "models".to_string());
        let staging = parent.join(format!(".{}.staging-{}", name, Uuid::new_v4()));

        fs::create_dir(&staging)?;
        let swapped = write_artifacts(&staging, bundle).and_then(|()| {
            if self.dir.exists() {
                self.swap_in(&staging, &parent, &name)
            } else {
                fs::rename(&staging, &self.dir).map_err(StorageError::from)
            }
        });
        if let Err(e) = swapped {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!("Could not remove staging directory {:?}: {}", staging, cleanup);
            }
            return Err(e);
        }

        info!(
            "Saved {} bundle ({} features) to {:?}",
            bundle.metadata.model_name,
            bundle.dimension(),
            self.dir
        );
        Ok(())
    }

    /// Fail unless the target is absent or holds only bundle artifacts
    fn check_replaceable(&self) -> Result<(), StorageError> {
        if !self.dir.exists() {
            return Ok(());
        }
        if !self.dir.is_dir() {
            return Err(StorageError::ForeignEntries {
                dir: self.dir.clone(),
                entries: vec!["(not a directory)".to_string()],
            });
        }
        let mut foreign = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let file_name = entry?.file_name().to_string_lossy().into_owned();
            if !Artifact::ALL.iter().any(|a| a.file_name() == file_name) {
                foreign.push(file_name);
            }
        }
        if foreign.is_empty() {
            Ok(())
        } else {
            foreign.sort();
            Err(StorageError::ForeignEntries {
                dir: self.dir.clone(),
                entries: foreign,
            })
        }
    }

    /// Swap a complete staging directory for the existing bundle
    fn swap_in(&self, staging: &Path, parent: &Path, name: &str) -> Result<(), StorageError> {
        let retired = parent.join(format!(".{}.old-{}", name, Uuid::new_v4()));
        fs::rename(&self.dir, &retired)?;
        if let Err(e) = fs::rename(staging, &self.dir) {
            // put the previous bundle back
            if let Err(restore) = fs::rename(&retired, &self.dir) {
                warn!("Could not restore previous bundle from {:?}: {}", retired, restore);
            }
            return Err(e.into());
        }
        if let Err(e) = fs::remove_dir_all(&retired) {
            warn!("Could not remove retired bundle {:?}: {}", retired, e);
        }
        Ok(())
    }

    /// Read the bundle; callers decide how to serve each outcome.
    ///
    /// Artifacts are read one after another by path. The registry assumes a
    /// single writer that never saves while a service is loading, so no lock
    /// guards against reading a mix of two bundles.
    pub fn load(&self) -> LoadOutcome {
        if !self.dir.is_dir() {
            info!("No model directory at {:?}", self.dir);
            return LoadOutcome::Absent;
        }

        let mut report = ArtifactReport::default();
        let classifier = self.read_artifact(Artifact::Classifier, &mut report, |bytes| {
            postcard::from_bytes::<Classifier>(bytes).map_err(|e| e.to_string())
        });
        let scaler = self.read_artifact(Artifact::Scaler, &mut report, from_json::<StandardScaler>);
        let encoder = self.read_artifact(Artifact::LabelEncoder, &mut report, |bytes| {
            let parsed: LabelEncoder = from_json(bytes)?;
            LabelEncoder::from_classes(parsed.classes().to_vec()).map_err(|e| e.to_string())
        });
        let feature_names =
            self.read_artifact(Artifact::FeatureNames, &mut report, from_json::<Vec<String>>);
        let metadata =
            self.read_artifact(Artifact::Metadata, &mut report, from_json::<ModelMetadata>);

        if report.all_missing() {
            info!("Model directory {:?} holds no artifacts", self.dir);
            return LoadOutcome::Absent;
        }

        let (Some(model), Some(scaler), Some(encoder), Some(feature_names), Some(metadata)) =
            (classifier, scaler, encoder, feature_names, metadata.clone())
        else {
            let reason = report.summary();
            warn!("Model bundle in {:?} is incomplete: {}", self.dir, reason);
            return LoadOutcome::Incomplete {
                report,
                reason,
                metadata,
            };
        };

        let bundle = ModelBundle {
            model,
            scaler,
            encoder,
            feature_names,
            metadata,
        };
        if let Err(e) = bundle.validate() {
            let reason = e.to_string();
            warn!("Model bundle in {:?} is inconsistent: {}", self.dir, reason);
            return LoadOutcome::Incomplete {
                report,
                reason,
                metadata: Some(bundle.metadata),
            };
        }

        info!(
            "Loaded {} bundle: {} features, classes {:?}",
            bundle.metadata.model_name,
            bundle.dimension(),
            bundle.encoder.classes()
        );
        LoadOutcome::Ready(bundle)
    }

    fn read_artifact<T>(
        &self,
        artifact: Artifact,
        report: &mut ArtifactReport,
        parse: impl FnOnce(&[u8]) -> Result<T, String>,
    ) -> Option<T> {
        let path = self.dir.join(artifact.file_name());
        let state = match fs::read(&path) {
            Ok(bytes) => match parse(&bytes) {
                Ok(value) => {
                    debug!("Loaded {} from {:?}", artifact, path);
                    report.set(artifact, ArtifactState::Loaded);
                    return Some(value);
                }
                Err(reason) => ArtifactState::Corrupt { reason },
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => ArtifactState::Missing,
            Err(e) => ArtifactState::Corrupt {
                reason: e.to_string(),
            },
        };
        report.set(artifact, state);
        None
    }
}

fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn write_artifacts(dir: &Path, bundle: &ModelBundle) -> Result<(), StorageError> {
    let classifier = postcard::to_allocvec(&bundle.model)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
    write_file(&dir.join(Artifact::Classifier.file_name()), &classifier)?;
    write_file(&dir.join(Artifact::Scaler.file_name()), &to_json(&bundle.scaler)?)?;
    write_file(
        &dir.join(Artifact::LabelEncoder.file_name()),
        &to_json(&bundle.encoder)?,
    )?;
    write_file(
        &dir.join(Artifact::FeatureNames.file_name()),
        &to_json(&bundle.feature_names)?,
    )?;
    write_file(
        &dir.join(Artifact::Metadata.file_name()),
        &to_json(&bundle.metadata)?,
    )?;
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model_trainer::{rank_importances, BoostingParams, CandidateSpec};
    use ndarray::array;

    fn bundle() -> ModelBundle {
        let x = array![[0.0, 1.0], [1.0, 0.5], [4.0, 0.0], [5.0, 0.2]];
        let y = [0, 0, 1, 1];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let scaled = scaler.transform(x.view()).unwrap();
        let spec = CandidateSpec::GradientBoosting(BoostingParams {
            n_estimators: 3,
            ..BoostingParams::default()
        });
        let model = spec.fit(scaled.view(), &y, 2, 42).unwrap();
        let encoder = LabelEncoder::fit(&["fresh", "spoiled"]);
        let feature_names = vec!["raw_ch0".to_string(), "VOC_raw".to_string()];
        let metadata = ModelMetadata {
            model_name: spec.name().to_string(),
            accuracy: 1.0,
            feature_count: 2,
            training_date: Utc::now(),
            classes: encoder.classes().to_vec(),
            feature_names: feature_names.clone(),
            hyperparameters: spec.hyperparameters(),
            oob_score: None,
            random_seed: Some(42),
            cv_mean: Some(1.0),
            cv_std: Some(0.0),
            candidates: Vec::new(),
            feature_importance: rank_importances(&feature_names, &model.feature_importances()),
        };
        ModelBundle {
            model,
            scaler,
            encoder,
            feature_names,
            metadata,
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        let original = bundle();
        registry.save(&original).unwrap();

        for artifact in Artifact::ALL {
            assert!(registry.dir().join(artifact.file_name()).is_file());
        }
        match registry.load() {
            LoadOutcome::Ready(loaded) => {
                assert_eq!(loaded.model, original.model);
                assert_eq!(loaded.scaler, original.scaler);
                assert_eq!(loaded.encoder, original.encoder);
                assert_eq!(loaded.feature_names, original.feature_names);
                assert_eq!(loaded.metadata, original.metadata);
            }
            other => panic!("expected ready bundle, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("nothing-here"));
        assert!(matches!(registry.load(), LoadOutcome::Absent));

        let empty = ModelRegistry::new(dir.path());
        assert!(matches!(empty.load(), LoadOutcome::Absent));
    }

    #[test]
    fn test_missing_scaler_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        registry.save(&bundle()).unwrap();
        fs::remove_file(registry.dir().join("scaler.json")).unwrap();

        match registry.load() {
            LoadOutcome::Incomplete {
                report,
                reason,
                metadata,
            } => {
                assert_eq!(*report.state(Artifact::Scaler), ArtifactState::Missing);
                assert!(report.is_loaded(Artifact::Classifier));
                assert!(reason.contains("scaler missing"));
                assert_eq!(metadata.map(|m| m.feature_count), Some(2));
            }
            other => panic!("expected incomplete bundle, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_classifier_reported() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        registry.save(&bundle()).unwrap();
        fs::write(registry.dir().join("classifier.bin"), b"\xff\xff").unwrap();

        let outcome = registry.load();
        assert!(matches!(
            outcome.report().state(Artifact::Classifier),
            ArtifactState::Corrupt { .. }
        ));
        assert!(matches!(outcome, LoadOutcome::Incomplete { .. }));
    }

    #[test]
    fn test_disagreeing_artifacts_are_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        registry.save(&bundle()).unwrap();
        fs::write(
            registry.dir().join("feature_names.json"),
            r#"["raw_ch0", "VOC_raw", "extra"]"#,
        )
        .unwrap();

        match registry.load() {
            LoadOutcome::Incomplete { report, reason, .. } => {
                assert!(report.all_loaded());
                assert!(reason.contains("Inconsistent"), "{}", reason);
            }
            other => panic!("expected incomplete bundle, got {:?}", other),
        }
    }

    #[test]
    fn test_unsorted_classes_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        registry.save(&bundle()).unwrap();
        fs::write(
            registry.dir().join("label_encoder.json"),
            r#"{"classes": ["spoiled", "fresh"]}"#,
        )
        .unwrap();
        let report = registry.load().report();
        assert!(matches!(
            report.state(Artifact::LabelEncoder),
            ArtifactState::Corrupt { .. }
        ));
    }

    #[test]
    fn test_save_replaces_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        registry.save(&bundle()).unwrap();

        let mut next = bundle();
        next.metadata.accuracy = 0.5;
        registry.save(&next).unwrap();

        match registry.load() {
            LoadOutcome::Ready(loaded) => assert_eq!(loaded.metadata.accuracy, 0.5),
            other => panic!("expected ready bundle, got {:?}", other),
        }
        // only the model directory remains beside the tempdir root
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_keeps_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("readings.csv"), "raw_ch0,label\n1.0,fresh\n").unwrap();

        let registry = ModelRegistry::new(&data);
        assert!(matches!(
            registry.save(&bundle()),
            Err(StorageError::ForeignEntries { ref entries, .. }) if entries == &["readings.csv"]
        ));
        assert!(data.join("readings.csv").exists());
        assert!(!data.join(Artifact::Classifier.file_name()).exists());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        // a file added next to an existing bundle also blocks replacement
        let registry = ModelRegistry::new(dir.path().join("models"));
        registry.save(&bundle()).unwrap();
        fs::write(registry.dir().join("notes.txt"), "keep").unwrap();
        assert!(registry.save(&bundle()).is_err());
        assert!(registry.dir().join("notes.txt").exists());
        assert!(matches!(registry.load(), LoadOutcome::Ready(_)));
    }

    #[test]
    fn test_failed_swap_removes_staging() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("m")).unwrap();
        // renaming `m/.` away always fails
        let registry = ModelRegistry::new(dir.path().join("m").join("."));
        assert!(matches!(registry.save(&bundle()), Err(StorageError::Io(_))));

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["m".to_string()]);
    }

    #[test]
    fn test_corrupt_tree_links_are_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        registry.save(&bundle()).unwrap();

        let mut value = serde_json::to_value(&bundle().model).unwrap();
        value["GradientBoosting"]["stages"][0][0]["nodes"][0]["Split"]["left"] =
            serde_json::json!(500);
        let corrupt: Classifier = serde_json::from_value(value).unwrap();
        fs::write(
            registry.dir().join(Artifact::Classifier.file_name()),
            postcard::to_allocvec(&corrupt).unwrap(),
        )
        .unwrap();

        match registry.load() {
            LoadOutcome::Incomplete { reason, metadata, .. } => {
                assert!(reason.contains("GradientBoosting"));
                assert!(metadata.is_some());
            }
            other => panic!("expected incomplete bundle, got {:?}", other),
        }
    }

    #[test]
    fn test_inconsistent_bundle_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        let mut broken = bundle();
        broken.feature_names.push("extra".to_string());
        assert!(matches!(
            registry.save(&broken),
            Err(StorageError::InvalidBundle(_))
        ));
        assert!(!registry.dir().exists());
    }
}
