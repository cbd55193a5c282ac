use serde::Serialize;

use crate::services::charts::{ChartKind, Eligibility};
use crate::services::dataset::Dataset;
use crate::services::summary::SummaryRecord;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub insights: SummaryRecord,
    pub filename: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub filename: String,
    pub rows: usize,
    pub insights: SummaryRecord,
}

/// One line of the chart menu: whether the chart can be drawn, and on what.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub kind: ChartKind,
    pub title: &'static str,
    pub eligible: bool,
    pub columns: Vec<String>,
    pub reason: Option<String>,
}

impl CatalogEntry {
    pub fn from_eligibility(dataset: &Dataset, eligibility: Eligibility) -> Self {
        let kind = eligibility.kind();
        let columns = match &eligibility {
            Eligibility::Eligible(spec) => spec
                .binding
                .columns()
                .into_iter()
                .filter_map(|idx| dataset.name(idx).map(str::to_string))
                .collect(),
            Eligibility::Rejected { .. } => Vec::new(),
        };
        Self {
            kind,
            title: kind.title(),
            eligible: eligibility.is_eligible(),
            columns,
            reason: eligibility.reason().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub index: usize,
    pub kind: ChartKind,
    pub title: String,
}
