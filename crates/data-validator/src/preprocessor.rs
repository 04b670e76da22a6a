//! Training-Time Dataset Cleaning

use crate::error::ValidationError;
use crate::impute::{bound_infinite, is_missing, median, Imputation};
use crate::table::{Dataset, RawTable};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Preprocessing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Column holding the class label
    pub label_column: String,
    /// Identifier, target and auxiliary columns kept out of the feature set
    pub excluded_columns: Vec<String>,
    /// Column-name prefixes of spectral channels (zero-imputed)
    pub spectral_prefixes: Vec<String>,
    /// Drop rows whose feature cells are all missing
    pub drop_empty_rows: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            excluded_columns: vec![
                "timestamp_ms".to_string(),
                "timestamp".to_string(),
                "label".to_string(),
                "CFU_value".to_string(),
                "device_id".to_string(),
            ],
            spectral_prefixes: vec![
                "raw_ch".to_string(),
                "reflect_ch".to_string(),
                "absorb_ch".to_string(),
            ],
            drop_empty_rows: false,
        }
    }
}

impl PreprocessConfig {
    /// Whether a column is a spectral channel
    pub fn is_spectral(&self, column: &str) -> bool {
        self.spectral_prefixes.iter().any(|p| column.starts_with(p.as_str()))
    }

    /// Whether a column is excluded from the feature set
    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded_columns.iter().any(|c| c == column)
    }
}

/// Counters describing what cleaning did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_unlabeled: usize,
    pub dropped_empty: usize,
    pub zero_imputed: usize,
    pub median_imputed: usize,
    pub sentinel_replaced: usize,
}

/// Output of cleaning
#[derive(Debug, Clone)]
pub struct CleanedData {
    /// All numeric columns, cleaned (auxiliary columns included)
    pub dataset: Dataset,
    /// Base feature columns in table order
    pub feature_columns: Vec<String>,
    /// What was changed
    pub report: PreprocessReport,
}

/// Cleans raw rows into a dense, finite dataset
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a preprocessor with the given config
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Clean a raw table.
    ///
    /// Fails with `EmptyDataset` when no labelled row survives.
    pub fn clean(&self, table: &RawTable) -> Result<CleanedData, ValidationError> {
        let mut report = PreprocessReport {
            rows_in: table.len(),
            ..Default::default()
        };

        let feature_columns: Vec<String> = table
            .columns
            .iter()
            .filter(|c| !self.config.is_excluded(c))
            .cloned()
            .collect();
        let feature_idx: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !self.config.is_excluded(c))
            .map(|(i, _)| i)
            .collect();

        let mut kept = Vec::with_capacity(table.len());
        for (row_idx, (cells, label)) in table.cells.iter().zip(&table.labels).enumerate() {
            let labelled = label.as_deref().map_or(false, |l| !l.trim().is_empty());
            if !labelled {
                report.dropped_unlabeled += 1;
                continue;
            }
            if self.config.drop_empty_rows
                && !feature_idx.is_empty()
                && feature_idx.iter().all(|&i| is_missing(cells[i]))
            {
                report.dropped_empty += 1;
                continue;
            }
            kept.push(row_idx);
        }

        if kept.is_empty() {
            return Err(ValidationError::EmptyDataset {
                stage: "preprocessing",
            });
        }

        let imputations: Vec<Imputation> = table
            .columns
            .iter()
            .enumerate()
            .map(|(col, name)| {
                if self.config.is_spectral(name) {
                    Imputation::Zero
                } else {
                    let present = kept.iter().filter_map(|&r| table.cells[r][col]);
                    Imputation::Median(median(present).unwrap_or(0.0))
                }
            })
            .collect();

        let mut values = Array2::<f64>::zeros((kept.len(), table.columns.len()));
        let mut labels = Vec::with_capacity(kept.len());
        for (out_row, &row) in kept.iter().enumerate() {
            for (col, imputation) in imputations.iter().enumerate() {
                let cell = table.cells[row][col];
                values[[out_row, col]] = if is_missing(cell) {
                    match imputation {
                        Imputation::Zero => report.zero_imputed += 1,
                        Imputation::Median(_) => report.median_imputed += 1,
                    }
                    imputation.value()
                } else {
                    let v = cell.unwrap_or_default();
                    if v.is_infinite() {
                        report.sentinel_replaced += 1;
                    }
                    bound_infinite(v)
                };
            }
            labels.push(table.labels[row].clone().unwrap_or_default().trim().to_string());
        }
        report.rows_out = kept.len();

        debug!("Imputation plan: {:?}", imputations);
        info!(
            "Preprocessed {} rows -> {} (unlabeled={}, empty={}, zero_imputed={}, median_imputed={}, sentinels={})",
            report.rows_in,
            report.rows_out,
            report.dropped_unlabeled,
            report.dropped_empty,
            report.zero_imputed,
            report.median_imputed,
            report.sentinel_replaced
        );

        let dataset = Dataset::new(table.columns.clone(), values, labels)?;
        Ok(CleanedData {
            dataset,
            feature_columns,
            report,
        })
    }
}
