//! Raw and Cleaned Tabular Data

use crate::error::ValidationError;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Raw rows as read from disk: named numeric columns with optional cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Numeric column names, in file order
    pub columns: Vec<String>,
    /// One entry per row, one cell per column (`None` = missing)
    pub cells: Vec<Vec<Option<f64>>>,
    /// Label per row (`None` = missing)
    pub labels: Vec<Option<String>>,
}

impl RawTable {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            cells: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Append a row, checking its width
    pub fn push_row(
        &mut self,
        cells: Vec<Option<f64>>,
        label: Option<String>,
    ) -> Result<(), ValidationError> {
        if cells.len() != self.columns.len() {
            return Err(ValidationError::RaggedRow {
                row: self.cells.len(),
                expected: self.columns.len(),
                actual: cells.len(),
            });
        }
        self.cells.push(cells);
        self.labels.push(label);
        Ok(())
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Concatenate tables, taking the union of their columns in first-seen order.
    ///
    /// Cells of columns a table does not carry are missing.
    pub fn concat(tables: Vec<RawTable>) -> RawTable {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut merged = RawTable::new(columns);
        for table in tables {
            let mapping: Vec<Option<usize>> = merged
                .columns
                .iter()
                .map(|c| table.column_index(c))
                .collect();
            for (row, label) in table.cells.into_iter().zip(table.labels) {
                let cells = mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row[i]))
                    .collect();
                merged.cells.push(cells);
                merged.labels.push(label);
            }
        }
        merged
    }
}

/// Cleaned dataset: dense values with column names and one label per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column names, one per matrix column
    pub columns: Vec<String>,
    /// Row-major values (rows = samples)
    pub values: Array2<f64>,
    /// Label per row
    pub labels: Vec<String>,
}

impl Dataset {
    /// Build a dataset, checking shapes and column uniqueness
    pub fn new(
        columns: Vec<String>,
        values: Array2<f64>,
        labels: Vec<String>,
    ) -> Result<Self, ValidationError> {
        if values.ncols() != columns.len() {
            return Err(ValidationError::DimensionMismatch {
                expected: columns.len(),
                actual: values.ncols(),
            });
        }
        if values.nrows() != labels.len() {
            return Err(ValidationError::DimensionMismatch {
                expected: values.nrows(),
                actual: labels.len(),
            });
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(ValidationError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            values,
            labels,
        })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// Whether the dataset has no samples
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// View of one column by name
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.values.column(i))
    }

    /// Gather the named columns, in the given order, into a new matrix
    pub fn select(&self, names: &[String]) -> Result<Array2<f64>, ValidationError> {
        let indices = names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| ValidationError::UnknownColumn(n.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.values.select(Axis(1), &indices))
    }

    /// Append columns to the right of the existing ones
    pub fn with_columns(
        self,
        names: Vec<String>,
        extra: Array2<f64>,
    ) -> Result<Self, ValidationError> {
        if extra.nrows() != self.values.nrows() {
            return Err(ValidationError::DimensionMismatch {
                expected: self.values.nrows(),
                actual: extra.nrows(),
            });
        }
        let values = ndarray::concatenate(Axis(1), &[self.values.view(), extra.view()])
            .map_err(|e| ValidationError::InvalidFormat(e.to_string()))?;
        let mut columns = self.columns;
        columns.extend(names);
        Dataset::new(columns, values, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = RawTable::new(vec!["a".into(), "b".into()]);
        assert!(table.push_row(vec![Some(1.0)], None).is_err());
        assert!(table.push_row(vec![Some(1.0), None], Some("fresh".into())).is_ok());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_concat_unions_columns() {
        let mut first = RawTable::new(vec!["a".into(), "b".into()]);
        first.push_row(vec![Some(1.0), Some(2.0)], Some("fresh".into())).unwrap();
        let mut second = RawTable::new(vec!["b".into(), "c".into()]);
        second.push_row(vec![Some(3.0), Some(4.0)], Some("spoiled".into())).unwrap();

        let merged = RawTable::concat(vec![first, second]);
        assert_eq!(merged.columns, vec!["a", "b", "c"]);
        assert_eq!(merged.cells[0], vec![Some(1.0), Some(2.0), None]);
        assert_eq!(merged.cells[1], vec![None, Some(3.0), Some(4.0)]);
        assert_eq!(merged.labels[1].as_deref(), Some("spoiled"));
    }

    #[test]
    fn test_select_and_append() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            array![[1.0, 2.0], [3.0, 4.0]],
            vec!["x".into(), "y".into()],
        )
        .unwrap();

        let picked = ds.select(&["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(picked, array![[2.0, 1.0], [4.0, 3.0]]);
        assert!(ds.select(&["zzz".to_string()]).is_err());

        let ds = ds.with_columns(vec!["c".into()], array![[5.0], [6.0]]).unwrap();
        assert_eq!(ds.columns, vec!["a", "b", "c"]);
        assert_eq!(ds.column("c").unwrap().to_vec(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = Dataset::new(
            vec!["a".into(), "a".into()],
            array![[1.0, 2.0]],
            vec!["x".into()],
        );
        assert!(matches!(result, Err(ValidationError::DuplicateColumn(_))));
    }
}
