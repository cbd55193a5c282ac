use std::collections::HashMap;

use calamine::Data;
use polars::prelude::*;

/// Spellings read as a missing value in delimited text.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
    "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a",
    "nan", "null",
];

/// One parsed cell before its column type is settled.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Missing,
    Number(f64),
    Text(String),
}

impl RawCell {
    pub fn from_text(field: &str) -> Self {
        if MISSING_TOKENS.contains(&field) {
            return RawCell::Missing;
        }
        // Infinities parse as numbers but have no place in a summary or an
        // axis range; they count as missing and keep the column numeric.
        match field.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => RawCell::Number(v),
            Ok(_) => RawCell::Missing,
            Err(_) => RawCell::Text(field.to_string()),
        }
    }

    pub fn from_sheet(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => RawCell::Missing,
            Data::Float(f) if f.is_finite() => RawCell::Number(*f),
            Data::Float(_) => RawCell::Missing,
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::String(s) if s.is_empty() => RawCell::Missing,
            other => RawCell::Text(other.to_string()),
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Missing => None,
            RawCell::Number(v) => Some(v.to_string()),
            RawCell::Text(s) => Some(s.clone()),
        }
    }
}

pub fn header_name(raw: &str, idx: usize) -> String {
    if raw.trim().is_empty() {
        format!("Unnamed: {}", idx)
    } else {
        raw.to_string()
    }
}

/// Builds a float series when every present cell is a number, a text series otherwise.
pub fn build_series(name: &str, cells: &[RawCell]) -> Series {
    let numeric = !cells.is_empty()
        && cells.iter().all(|c| !matches!(c, RawCell::Text(_)));

    if numeric {
        let nums: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                RawCell::Number(v) => Some(*v),
                _ => None,
            })
            .collect();
        Series::new(name, nums)
    } else {
        let strings: Vec<Option<String>> = cells.iter().map(RawCell::as_text).collect();
        Series::new(name, strings)
    }
}

pub fn numeric_values(series: &Series) -> Vec<Option<f64>> {
    series
        .cast(&DataType::Float64)
        .and_then(|s| s.f64().map(|ca| ca.into_iter().collect::<Vec<_>>()))
        .unwrap_or_else(|_| vec![None; series.len()])
}

pub fn label_values(series: &Series) -> Vec<Option<String>> {
    series
        .cast(&DataType::String)
        .and_then(|s| {
            s.str()
                .map(|ca| ca.into_iter().map(|v| v.map(str::to_owned)).collect::<Vec<_>>())
        })
        .unwrap_or_else(|_| vec![None; series.len()])
}

/// Counts of each present value, most frequent first; ties keep first appearance.
pub fn value_counts(values: &[Option<String>]) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in values.iter().flatten() {
        match index.get(value.as_str()) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                index.insert(value.as_str(), counts.len());
                counts.push((value.clone(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
