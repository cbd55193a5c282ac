use serde::Serialize;

use crate::error::AppError;
use crate::services::charts::{self, ChartArtifact, ChartKind, ChartOutcome};
use crate::services::dataset::Dataset;
use crate::services::summary::SummaryRecord;

/// Charts collected for the report, in the order they were produced.
/// Requesting the same chart twice keeps both copies.
#[derive(Debug, Default)]
pub struct ReportAccumulator {
    artifacts: Vec<ChartArtifact>,
}

impl ReportAccumulator {
    pub fn push(&mut self, artifact: ChartArtifact) -> usize {
        self.artifacts.push(artifact);
        self.artifacts.len() - 1
    }

    pub fn artifacts(&self) -> &[ChartArtifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    fn clear(&mut self) {
        self.artifacts.clear();
    }
}

pub struct ActiveDataset {
    pub filename: String,
    pub dataset: Dataset,
    pub summary: SummaryRecord,
}

/// What one interactive session works on: the current dataset and the
/// charts gathered from it. Loading a new dataset starts over.
#[derive(Default)]
pub struct Session {
    active: Option<ActiveDataset>,
    report: ReportAccumulator,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub appended: bool,
    pub warning: Option<String>,
    pub chart: Option<ChartArtifact>,
    pub report_size: usize,
}

impl Session {
    pub fn begin(&mut self, filename: String, dataset: Dataset, summary: SummaryRecord) {
        if !self.report.is_empty() {
            tracing::info!("Discarding {} charts from the previous dataset", self.report.len());
        }
        self.report.clear();
        self.active = Some(ActiveDataset { filename, dataset, summary });
    }

    pub fn active(&self) -> Result<&ActiveDataset, AppError> {
        self.active.as_ref().ok_or(AppError::NoDataset)
    }

    pub fn report(&self) -> &ReportAccumulator {
        &self.report
    }

    pub fn request_chart(&mut self, kind: ChartKind) -> Result<ChartRequest, AppError> {
        let active = self.active.as_ref().ok_or(AppError::NoDataset)?;

        let (chart, warning) = match charts::produce(&active.dataset, kind) {
            ChartOutcome::Rendered(artifact) => {
                let index = self.report.push(artifact.clone());
                tracing::info!("Added {} to the report at position {}", artifact.title, index);
                (Some(artifact), None)
            }
            ChartOutcome::Skipped { reason, .. } => (None, Some(reason)),
        };

        Ok(ChartRequest {
            kind,
            appended: chart.is_some(),
            warning,
            chart,
            report_size: self.report.len(),
        })
    }

    /// Produces the charts drawn on every load, returning their warnings.
    pub fn request_default_charts(&mut self) -> Result<Vec<String>, AppError> {
        let mut warnings = Vec::new();
        for kind in ChartKind::ALWAYS_ON {
            if let Some(warning) = self.request_chart(kind)?.warning {
                warnings.push(warning);
            }
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::summary::summarize;
    use polars::prelude::*;

    fn begin(session: &mut Session, name: &str, columns: Vec<Series>) {
        let dataset = Dataset::new(columns).unwrap();
        let summary = summarize(&dataset).unwrap();
        session.begin(name.to_string(), dataset, summary);
    }

    fn sales() -> Vec<Series> {
        vec![
            Series::new("category", &["a", "b", "a"]),
            Series::new("amount", &[1.0, 2.0, 3.0]),
        ]
    }

    #[test]
    fn requires_a_dataset() {
        let mut session = Session::default();
        assert!(matches!(session.request_chart(ChartKind::Bar), Err(AppError::NoDataset)));
        assert!(matches!(session.active(), Err(AppError::NoDataset)));
    }

    #[test]
    fn repeated_requests_append_duplicates() {
        let mut session = Session::default();
        begin(&mut session, "sales.csv", sales());

        let first = session.request_chart(ChartKind::Line).unwrap();
        let second = session.request_chart(ChartKind::Line).unwrap();
        assert!(first.appended && second.appended);
        assert_eq!(second.report_size, 2);
        assert_eq!(session.report().artifacts()[0], session.report().artifacts()[1]);
    }

    #[test]
    fn rejected_requests_do_not_append() {
        let mut session = Session::default();
        begin(&mut session, "sales.csv", sales());

        let request = session.request_chart(ChartKind::Sankey).unwrap();
        assert!(!request.appended);
        assert_eq!(request.warning.as_deref(), Some("Sankey Diagram requires at least 3 columns."));
        assert!(session.report().is_empty());
    }

    #[test]
    fn new_dataset_resets_the_report() {
        let mut session = Session::default();
        begin(&mut session, "sales.csv", sales());
        let warnings = session.request_default_charts().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(session.report().len(), 3);

        begin(&mut session, "names.csv", vec![Series::new("name", &["x", "y"])]);
        assert!(session.report().is_empty());
        assert_eq!(session.active().unwrap().filename, "names.csv");

        let warnings = session.request_default_charts().unwrap();
        assert_eq!(warnings, vec!["Histogram requires at least 2 columns.".to_string()]);
        assert_eq!(session.report().len(), 2);
    }
}
