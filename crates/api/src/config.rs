//! Service and Training Configuration
//!
//! Layers an optional TOML file under `LACTEVA__*` environment variables,
//! e.g. `LACTEVA__BIND_ADDRESS=0.0.0.0:9000` or `LACTEVA__LOG__JSON=true`.

use config::{Config, ConfigError, Environment, File};
use model_trainer::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prediction service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_address: String,
    /// Directory holding the model bundle
    pub model_dir: PathBuf,
    /// Serve Prometheus metrics at `/metrics`
    pub metrics: bool,
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8002".to_string(),
            model_dir: PathBuf::from("models"),
            metrics: true,
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from an optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("LACTEVA")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

/// Read a training pipeline configuration file
pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_sources() {
        let config = ServiceConfig::load(None).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        fs::write(
            &path,
            "bind_address = \"127.0.0.1:9100\"\nmodel_dir = \"/srv/models\"\n\n[log]\njson = true\n",
        )
        .unwrap();
        let config = ServiceConfig::load(Some(&path)).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9100");
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert!(config.log.json);
        assert_eq!(config.log.level, "info");
        assert!(config.metrics);
    }

    #[test]
    fn test_pipeline_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.toml");
        fs::write(
            &path,
            r#"
[training]
seed = 7
test_fraction = 0.25

[[training.roster]]
family = "gradient_boosting"
n_estimators = 20
learning_rate = 0.05
max_depth = 3
min_samples_split = 2
min_samples_leaf = 1

[preprocess]
label_column = "quality"
"#,
        )
        .unwrap();
        let config = load_pipeline_config(&path).unwrap();
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.test_fraction, 0.25);
        assert_eq!(config.training.cv_folds, 5);
        assert_eq!(config.training.roster.len(), 1);
        assert_eq!(config.training.roster[0].name(), "GradientBoosting");
        assert_eq!(config.preprocess.label_column, "quality");
    }
}
