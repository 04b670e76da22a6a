//! LACTEVA Model Training - Command Line Entry Point

use anyhow::Context;
use api::{init_logging, load_pipeline_config, LogConfig};
use clap::Parser;
use model_trainer::{PipelineConfig, PipelineError, TrainingPipeline};
use std::path::PathBuf;
use storage::ModelRegistry;
use tracing::info;

#[derive(Parser)]
#[command(name = "lacteva-train")]
#[command(about = "Train and select a milk freshness classifier from sensor CSV files")]
#[command(version)]
struct Cli {
    /// Labelled sensor CSV files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the model bundle is written to
    #[arg(short, long, default_value = "models")]
    model_dir: PathBuf,

    /// Random seed for splits and models
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file with preprocess, engineering and training sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column holding the class label
    #[arg(long)]
    label_column: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig {
        level: cli.log_level.clone(),
        json: false,
    })?;

    let mut config = match &cli.config {
        Some(path) => load_pipeline_config(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.training.seed = seed;
    }
    if let Some(label) = cli.label_column {
        config.preprocess.label_column = label;
    }

    let run = TrainingPipeline::new(config).run_files(&cli.inputs)?;
    ModelRegistry::new(cli.model_dir.clone())
        .save(&run.bundle)
        .map_err(|e| PipelineError::Persist(e.to_string()))?;

    let metadata = &run.bundle.metadata;
    for candidate in &metadata.candidates {
        info!(
            "{:<20} accuracy {:.4}  cv {:.4} ± {:.4}",
            candidate.name, candidate.accuracy, candidate.cv_mean, candidate.cv_std
        );
    }
    for report in &run.class_reports {
        info!(
            "{:<10} precision {:.3} recall {:.3} f1 {:.3} support {}",
            report.class, report.precision, report.recall, report.f1, report.support
        );
    }
    for feature in run.bundle.top_importances(10) {
        info!("{:<24} {:.4}", feature.feature, feature.importance);
    }
    info!(
        "Selected {} (accuracy {:.4}), bundle written to {}",
        metadata.model_name,
        metadata.accuracy,
        cli.model_dir.display()
    );
    Ok(())
}
