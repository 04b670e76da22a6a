//! CSV Dataset Loading

use crate::error::ValidationError;
use crate::table::RawTable;
use std::path::Path;
use tracing::{info, warn};

/// Read one headered CSV file.
///
/// `label_column` holds strings; every other column must parse as `f64`
/// (empty cells are missing). Columns with non-numeric cells are dropped.
pub fn load_csv(path: &Path, label_column: &str) -> Result<RawTable, ValidationError> {
    let reader = csv::Reader::from_path(path)?;
    read_csv(reader, label_column, &path.display().to_string())
}

/// Read several CSV files and concatenate them
pub fn load_csv_files<P: AsRef<Path>>(
    paths: &[P],
    label_column: &str,
) -> Result<RawTable, ValidationError> {
    let tables = paths
        .iter()
        .map(|p| load_csv(p.as_ref(), label_column))
        .collect::<Result<Vec<_>, _>>()?;
    let merged = RawTable::concat(tables);
    info!(
        "Loaded {} rows x {} numeric columns from {} file(s)",
        merged.len(),
        merged.columns.len(),
        paths.len()
    );
    Ok(merged)
}

/// Parse CSV from any reader (used by tests and `load_csv`)
pub fn read_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    label_column: &str,
    source: &str,
) -> Result<RawTable, ValidationError> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let label_idx = headers
        .iter()
        .position(|h| h == label_column)
        .ok_or_else(|| ValidationError::MissingLabelColumn(label_column.to_string()))?;

    let mut numeric = vec![true; headers.len()];
    numeric[label_idx] = false;
    let mut rows: Vec<Vec<Option<f64>>> = Vec::new();
    let mut labels = Vec::new();

    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(ValidationError::RaggedRow {
                row: row_no,
                expected: headers.len(),
                actual: record.len(),
            });
        }
        let mut cells = Vec::with_capacity(headers.len());
        for (col, raw) in record.iter().enumerate() {
            let raw = raw.trim();
            if col == label_idx || raw.is_empty() {
                cells.push(None);
                continue;
            }
            match parse_cell(raw) {
                Some(v) => cells.push(Some(v)),
                None => {
                    numeric[col] = false;
                    cells.push(None);
                }
            }
        }
        let label = record
            .get(label_idx)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        rows.push(cells);
        labels.push(label);
    }

    for (col, name) in headers.iter().enumerate() {
        if col != label_idx && !numeric[col] {
            warn!("{}: dropping non-numeric column '{}'", source, name);
        }
    }

    let keep: Vec<usize> = (0..headers.len()).filter(|&c| numeric[c]).collect();
    let mut table = RawTable::new(keep.iter().map(|&c| headers[c].clone()).collect());
    for (cells, label) in rows.into_iter().zip(labels) {
        table.push_row(keep.iter().map(|&c| cells[c]).collect(), label)?;
    }
    Ok(table)
}

/// Parse a numeric cell, accepting pandas-style spellings of special values
fn parse_cell(raw: &str) -> Option<f64> {
    match raw.to_ascii_lowercase().as_str() {
        "nan" | "na" | "null" | "none" => Some(f64::NAN),
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => raw.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<RawTable, ValidationError> {
        read_csv(csv::Reader::from_reader(text.as_bytes()), "label", "test")
    }

    #[test]
    fn test_numeric_and_label_columns() {
        let table = parse("timestamp_ms,raw_ch0,label\n1,10.5,fresh\n2,,spoiled\n").unwrap();
        assert_eq!(table.columns, vec!["timestamp_ms", "raw_ch0"]);
        assert_eq!(table.cells[0], vec![Some(1.0), Some(10.5)]);
        assert_eq!(table.cells[1], vec![Some(2.0), None]);
        assert_eq!(table.labels, vec![Some("fresh".into()), Some("spoiled".into())]);
    }

    #[test]
    fn test_non_numeric_column_dropped() {
        let table = parse("device_id,raw_ch0,label\nLACTEVA_001,1,fresh\n").unwrap();
        assert_eq!(table.columns, vec!["raw_ch0"]);
    }

    #[test]
    fn test_special_values_and_blank_label() {
        let table = parse("raw_ch0,label\ninf,fresh\nNaN,\n").unwrap();
        assert_eq!(table.cells[0][0], Some(f64::INFINITY));
        assert!(table.cells[1][0].map_or(false, f64::is_nan));
        assert_eq!(table.labels[1], None);
    }

    #[test]
    fn test_missing_label_column() {
        assert!(matches!(
            parse("raw_ch0\n1\n"),
            Err(ValidationError::MissingLabelColumn(_))
        ));
    }

    #[test]
    fn test_load_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.csv");
        let spoiled = dir.path().join("spoiled.csv");
        writeln!(std::fs::File::create(&fresh).unwrap(), "raw_ch0,label\n1,fresh").unwrap();
        writeln!(
            std::fs::File::create(&spoiled).unwrap(),
            "raw_ch0,VOC_raw,label\n2,300,spoiled"
        )
        .unwrap();

        let table = load_csv_files(&[fresh, spoiled], "label").unwrap();
        assert_eq!(table.columns, vec!["raw_ch0", "VOC_raw"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cells[0][1], None);
    }
}
