pub mod eligibility;
pub mod renderer;
pub mod types;

use serde::Serialize;

use crate::services::dataset::Dataset;
pub use eligibility::{eligibility, eligible_charts};
pub use renderer::render;
pub use types::{ChartArtifact, ChartKind, Eligibility};

/// Result of asking for one chart: either an artifact, or the reason none was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChartOutcome {
    Rendered(ChartArtifact),
    Skipped { kind: ChartKind, reason: String },
}

/// Checks eligibility, then renders; both kinds of failure become a skip.
pub fn produce(dataset: &Dataset, kind: ChartKind) -> ChartOutcome {
    let spec = match eligibility(dataset, kind) {
        Eligibility::Eligible(spec) => spec,
        Eligibility::Rejected { kind, reason } => {
            tracing::info!("{} not eligible: {}", kind, reason);
            return ChartOutcome::Skipped { kind, reason };
        }
    };

    match render(&spec, dataset) {
        Ok(artifact) => {
            tracing::debug!("Rendered {}", artifact.title);
            ChartOutcome::Rendered(artifact)
        }
        Err(e) => {
            let reason = format!("{} error: {}", kind.title(), e);
            tracing::warn!("{}", reason);
            ChartOutcome::Skipped { kind, reason }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dataset;
    use polars::prelude::*;
    use std::io::Write;

    #[test]
    fn category_amount_csv_renders_every_y_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spend.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"category,amount\nfood,12.5\nrent,900.0\nfood,8.25\nfun,40.0\nrent,875.5\n")
            .unwrap();

        let dataset = dataset::load(&path).unwrap();
        for kind in [
            ChartKind::Line,
            ChartKind::Box,
            ChartKind::Area,
            ChartKind::Treemap,
            ChartKind::Violin,
        ] {
            match produce(&dataset, kind) {
                ChartOutcome::Rendered(artifact) => assert_eq!(artifact.kind, kind),
                ChartOutcome::Skipped { reason, .. } => panic!("{} skipped: {}", kind, reason),
            }
        }
    }

    #[test]
    fn render_failures_become_warnings() {
        let dataset = Dataset::new(vec![
            Series::new("a", &["x"]),
            Series::new("b", &["y"]),
            Series::new("c", &["z"]),
        ])
        .unwrap();

        let outcome = produce(&dataset, ChartKind::Sunburst);
        assert_eq!(
            outcome,
            ChartOutcome::Skipped {
                kind: ChartKind::Sunburst,
                reason: "Sunburst Chart error: 'c' must be numeric".to_string(),
            }
        );
    }

    #[test]
    fn ineligible_charts_report_their_reason() {
        let dataset = Dataset::new(vec![Series::new("a", &["x"])]).unwrap();
        let ChartOutcome::Skipped { reason, .. } = produce(&dataset, ChartKind::Sankey) else {
            panic!("sankey should not render with one column");
        };
        assert_eq!(reason, "Sankey Diagram requires at least 3 columns.");
    }
}
