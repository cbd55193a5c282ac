use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::Series;

use crate::error::AppError;
use super::types::Dataset;
use super::utils::{build_series, header_name, RawCell};

/// Loads a dataset from disk. `.csv` files are read as delimited text,
/// anything else as a spreadsheet (first sheet only).
pub fn load(path: &Path) -> Result<Dataset, AppError> {
    let start = std::time::Instant::now();
    let is_csv = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.to_ascii_lowercase().ends_with(".csv"));

    let (headers, rows) = if is_csv {
        read_csv(path)?
    } else {
        read_first_sheet(path)?
    };

    if headers.is_empty() {
        tracing::warn!("{} produced no columns", path.display());
        return Err(AppError::EmptyDataset);
    }

    let columns: Vec<Series> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<RawCell> = rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or(RawCell::Missing))
                .collect();
            build_series(name, &cells)
        })
        .collect();

    let dataset = Dataset::new(columns)?;
    tracing::info!(
        "Loaded {} ({} rows x {} columns) in {:?}",
        path.display(),
        dataset.height(),
        dataset.width(),
        start.elapsed()
    );
    Ok(dataset)
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<RawCell>>), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| header_name(h, idx))
        .collect();

    // Short rows are padded with missing cells by `load`; long rows have
    // nowhere to go.
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            return Err(AppError::UnreadableFile(format!(
                "Line {} has {} fields, expected at most {}",
                line,
                record.len(),
                headers.len()
            )));
        }
        rows.push(record.iter().map(RawCell::from_text).collect());
    }

    Ok((headers, rows))
}

fn read_first_sheet(path: &Path) -> Result<(Vec<String>, Vec<Vec<RawCell>>), AppError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        tracing::error!("Failed to open workbook {}: {}", path.display(), e);
        AppError::UnreadableFile(format!("Failed to open spreadsheet: {}", e))
    })?;

    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok((Vec::new(), Vec::new()));
    };
    let range = range?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(idx, cell)| match cell {
                    Data::Empty => header_name("", idx),
                    other => header_name(&other.to_string(), idx),
                })
                .collect()
        })
        .unwrap_or_default();

    let rows = sheet_rows
        .map(|row| row.iter().map(RawCell::from_sheet).collect())
        .collect();

    Ok((headers, rows))
}
