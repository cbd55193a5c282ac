use polars::prelude::*;
use serde::Serialize;

use crate::error::AppError;
use super::utils::{label_values, numeric_values};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl ColumnType {
    pub fn of(series: &Series) -> Self {
        if series.dtype().is_numeric() {
            ColumnType::Numeric
        } else {
            ColumnType::Categorical
        }
    }
}

/// An ordered set of equally long columns.
///
/// Columns are held as a plain vector of series rather than a `DataFrame`
/// so that repeated header names survive loading untouched.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Series>,
}

impl Dataset {
    pub fn new(columns: Vec<Series>) -> Result<Self, AppError> {
        let Some(first) = columns.first() else {
            return Err(AppError::EmptyDataset);
        };

        let height = first.len();
        if let Some(ragged) = columns.iter().find(|s| s.len() != height) {
            return Err(AppError::UnreadableFile(format!(
                "Column '{}' has {} values, expected {}",
                ragged.name(),
                ragged.len(),
                height
            )));
        }

        Ok(Self { columns })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |s| s.len())
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(|s| s.name())
    }

    pub fn column_type(&self, idx: usize) -> Option<ColumnType> {
        self.columns.get(idx).map(ColumnType::of)
    }

    pub fn is_numeric(&self, idx: usize) -> bool {
        self.column_type(idx) == Some(ColumnType::Numeric)
    }

    /// Positions of every numeric column, in column order.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.width()).filter(|&idx| self.is_numeric(idx)).collect()
    }

    pub fn numbers(&self, idx: usize) -> Vec<Option<f64>> {
        self.columns.get(idx).map(numeric_values).unwrap_or_default()
    }

    pub fn labels(&self, idx: usize) -> Vec<Option<String>> {
        self.columns.get(idx).map(label_values).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_columns() {
        assert!(matches!(Dataset::new(Vec::new()), Err(AppError::EmptyDataset)));
    }

    #[test]
    fn rejects_unequal_lengths() {
        let columns = vec![
            Series::new("a", &["x", "y"]),
            Series::new("b", &[1.0, 2.0, 3.0]),
        ];
        assert!(matches!(Dataset::new(columns), Err(AppError::UnreadableFile(_))));
    }

    #[test]
    fn keeps_duplicate_names_and_classifies_columns() {
        let dataset = Dataset::new(vec![
            Series::new("value", &["a", "b"]),
            Series::new("value", &[Some(1.0), None]),
        ])
        .unwrap();

        assert_eq!(dataset.width(), 2);
        assert_eq!(dataset.height(), 2);
        assert_eq!(dataset.name(0), dataset.name(1));
        assert_eq!(dataset.column_type(0), Some(ColumnType::Categorical));
        assert_eq!(dataset.column_type(1), Some(ColumnType::Numeric));
        assert_eq!(dataset.numeric_columns(), vec![1]);
        assert_eq!(dataset.numbers(1), vec![Some(1.0), None]);
        assert_eq!(dataset.labels(0), vec![Some("a".to_string()), Some("b".to_string())]);
        assert_eq!(dataset.column_type(5), None);
    }
}
