use polars::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::AppError;
use crate::services::dataset::{ColumnType, Dataset};
use crate::services::dataset::utils::value_counts;

/// A single statistic. `Empty` marks a statistic that does not apply to the
/// column (or is undefined for its data) and serializes as `""`.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Number(f64),
    Text(String),
    Empty,
}

impl From<Option<f64>> for StatValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => StatValue::Number(v),
            _ => StatValue::Empty,
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Number(v) => serializer.serialize_f64(*v),
            StatValue::Text(s) => serializer.serialize_str(s),
            StatValue::Empty => serializer.serialize_str(""),
        }
    }
}

/// Every column carries the full key set regardless of its type.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnSummary {
    pub count: StatValue,
    pub unique: StatValue,
    pub top: StatValue,
    pub freq: StatValue,
    pub mean: StatValue,
    pub std: StatValue,
    pub min: StatValue,
    #[serde(rename = "25%")]
    pub p25: StatValue,
    #[serde(rename = "50%")]
    pub p50: StatValue,
    #[serde(rename = "75%")]
    pub p75: StatValue,
    pub max: StatValue,
}

impl ColumnSummary {
    fn blank(count: usize, unique: usize) -> Self {
        Self {
            count: StatValue::Number(count as f64),
            unique: StatValue::Number(unique as f64),
            top: StatValue::Empty,
            freq: StatValue::Empty,
            mean: StatValue::Empty,
            std: StatValue::Empty,
            min: StatValue::Empty,
            p25: StatValue::Empty,
            p50: StatValue::Empty,
            p75: StatValue::Empty,
            max: StatValue::Empty,
        }
    }
}

/// Column name to statistics, in column order. Serializes as a JSON object;
/// repeated column names are written as repeated keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryRecord {
    pub columns: Vec<(String, ColumnSummary)>,
}

impl Serialize for SummaryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, summary) in &self.columns {
            map.serialize_entry(name, summary)?;
        }
        map.end()
    }
}

pub fn summarize(dataset: &Dataset) -> Result<SummaryRecord, AppError> {
    let mut columns = Vec::with_capacity(dataset.width());
    for (idx, series) in dataset.columns().iter().enumerate() {
        let summary = match dataset.column_type(idx) {
            Some(ColumnType::Numeric) => numeric_summary(series)?,
            _ => categorical_summary(series, &dataset.labels(idx))?,
        };
        columns.push((series.name().to_string(), summary));
    }

    Ok(SummaryRecord { columns })
}

fn numeric_summary(series: &Series) -> PolarsResult<ColumnSummary> {
    let floats = series.cast(&DataType::Float64)?;
    let ca = floats.f64()?;
    let count = ca.len() - ca.null_count();
    let unique = floats.drop_nulls().n_unique()?;

    let std = if count > 1 { ca.std(1) } else { None };
    Ok(ColumnSummary {
        mean: ca.mean().into(),
        std: std.into(),
        min: ca.min().into(),
        p25: ca.quantile(0.25, QuantileInterpolOptions::Linear)?.into(),
        p50: ca.median().into(),
        p75: ca.quantile(0.75, QuantileInterpolOptions::Linear)?.into(),
        max: ca.max().into(),
        ..ColumnSummary::blank(count, unique)
    })
}

fn categorical_summary(series: &Series, labels: &[Option<String>]) -> PolarsResult<ColumnSummary> {
    let count = series.len() - series.null_count();
    let unique = series.drop_nulls().n_unique()?;
    let mut summary = ColumnSummary::blank(count, unique);

    if let Some((top, freq)) = value_counts(labels).into_iter().next() {
        summary.top = StatValue::Text(top);
        summary.freq = StatValue::Number(freq as f64);
    }
    Ok(summary)
}
