use smallvec::smallvec;

use crate::services::dataset::Dataset;
use super::types::{Binding, ChartKind, ChartSpec, Eligibility};

/// Decides every chart kind against the dataset, in catalog order.
pub fn eligible_charts(dataset: &Dataset) -> Vec<Eligibility> {
    ChartKind::ALL
        .into_iter()
        .map(|kind| eligibility(dataset, kind))
        .collect()
}

pub fn eligibility(dataset: &Dataset, kind: ChartKind) -> Eligibility {
    match check(dataset, kind) {
        Ok(()) => Eligibility::Eligible(ChartSpec { kind, binding: bind(dataset, kind) }),
        Err(reason) => Eligibility::Rejected { kind, reason },
    }
}

fn check(dataset: &Dataset, kind: ChartKind) -> Result<(), String> {
    let pre = kind.precondition();

    if dataset.width() < pre.min_columns {
        return Err(format!("{} requires at least {} columns.", kind.title(), pre.min_columns));
    }

    if dataset.numeric_columns().len() < pre.min_numeric_columns {
        return Err(format!(
            "{} requires at least {} numeric columns.",
            kind.title(),
            pre.min_numeric_columns
        ));
    }

    if let Some(&idx) = pre.numeric_positions.iter().find(|&&idx| !dataset.is_numeric(idx)) {
        return Err(match kind {
            ChartKind::Scatter => "Scatter plot requires two numeric columns.".to_string(),
            _ => format!(
                "{} skipped: '{}' must be numeric.",
                kind.title(),
                dataset.name(idx).unwrap_or_default()
            ),
        });
    }

    Ok(())
}

/// Positional column binding; callers only bind after `check` passed.
fn bind(dataset: &Dataset, kind: ChartKind) -> Binding {
    match kind {
        ChartKind::Bar => Binding::ValueCounts { column: 0, top: 10 },
        ChartKind::Pie => Binding::ValueCounts { column: 0, top: 5 },
        ChartKind::Histogram => Binding::Distribution { column: 1 },
        ChartKind::Sankey => Binding::Flow { source: 0, target: 1, value: 2 },
        ChartKind::Sunburst => Binding::Hierarchy { path: smallvec![0, 1, 2], values: 2 },
        ChartKind::Treemap => Binding::Hierarchy { path: smallvec![0], values: 1 },
        ChartKind::Line
        | ChartKind::Box
        | ChartKind::Area
        | ChartKind::Scatter
        | ChartKind::Violin => Binding::Xy { x: 0, y: 1 },
        ChartKind::Heatmap => Binding::Correlation { columns: dataset.numeric_columns() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn dataset(columns: Vec<Series>) -> Dataset {
        Dataset::new(columns).unwrap()
    }

    fn text(name: &str) -> Series {
        Series::new(name, &["a", "b", "a"])
    }

    fn number(name: &str) -> Series {
        Series::new(name, &[1.0, 2.0, 3.0])
    }

    fn find(results: &[Eligibility], kind: ChartKind) -> &Eligibility {
        results.iter().find(|e| e.kind() == kind).unwrap()
    }

    #[test]
    fn bar_and_pie_always_eligible() {
        let shapes = vec![
            vec![text("a")],
            vec![number("a")],
            vec![text("a"), text("b")],
            vec![number("a"), number("b"), text("c"), number("d")],
        ];
        for columns in shapes {
            let results = eligible_charts(&dataset(columns));
            assert_eq!(results.len(), ChartKind::ALL.len());
            assert!(find(&results, ChartKind::Bar).is_eligible());
            assert!(find(&results, ChartKind::Pie).is_eligible());
        }
    }

    #[test]
    fn sankey_and_sunburst_need_three_columns() {
        for columns in [vec![text("a")], vec![text("a"), number("b")]] {
            let results = eligible_charts(&dataset(columns));
            for kind in [ChartKind::Sankey, ChartKind::Sunburst] {
                let result = find(&results, kind);
                assert!(!result.is_eligible());
                assert!(result.reason().unwrap().contains("3 columns"));
            }
        }

        let results = eligible_charts(&dataset(vec![text("a"), text("b"), text("c")]));
        assert_eq!(
            find(&results, ChartKind::Sankey),
            &Eligibility::Eligible(ChartSpec {
                kind: ChartKind::Sankey,
                binding: Binding::Flow { source: 0, target: 1, value: 2 },
            })
        );
        assert!(find(&results, ChartKind::Sunburst).is_eligible());
    }

    #[test]
    fn heatmap_needs_two_numeric_columns_anywhere() {
        let results = eligible_charts(&dataset(vec![text("a"), text("b"), number("c"), number("d")]));
        assert_eq!(
            find(&results, ChartKind::Heatmap),
            &Eligibility::Eligible(ChartSpec {
                kind: ChartKind::Heatmap,
                binding: Binding::Correlation { columns: vec![2, 3] },
            })
        );

        for columns in [vec![text("a"), number("b")], vec![text("a"), text("b")]] {
            let results = eligible_charts(&dataset(columns));
            let heatmap = find(&results, ChartKind::Heatmap);
            assert_eq!(heatmap.reason(), Some("Heatmap requires at least 2 numeric columns."));
        }
    }

    #[test]
    fn scatter_rejects_non_numeric_pair() {
        let results = eligible_charts(&dataset(vec![text("a"), text("b")]));
        let scatter = find(&results, ChartKind::Scatter);
        assert!(scatter.reason().unwrap().contains("two numeric columns"));

        let results = eligible_charts(&dataset(vec![number("x"), number("y")]));
        assert!(find(&results, ChartKind::Scatter).is_eligible());
    }

    #[test]
    fn numeric_y_charts_name_the_offending_column() {
        let results = eligible_charts(&dataset(vec![text("region"), text("owner")]));
        for kind in [
            ChartKind::Histogram,
            ChartKind::Line,
            ChartKind::Box,
            ChartKind::Area,
            ChartKind::Violin,
            ChartKind::Treemap,
        ] {
            let reason = find(&results, kind).reason().unwrap();
            assert!(reason.contains("'owner' must be numeric"), "{}: {}", kind, reason);
        }
        assert_eq!(
            find(&results, ChartKind::Treemap).reason(),
            Some("Treemap skipped: 'owner' must be numeric.")
        );
    }

    #[test]
    fn single_column_rejects_two_column_charts() {
        let results = eligible_charts(&dataset(vec![number("only")]));
        assert_eq!(
            find(&results, ChartKind::Histogram).reason(),
            Some("Histogram requires at least 2 columns.")
        );
        assert!(!find(&results, ChartKind::Line).is_eligible());
    }

    #[test]
    fn category_amount_binds_positionally() {
        let results = eligible_charts(&dataset(vec![text("category"), number("amount")]));
        for kind in [ChartKind::Line, ChartKind::Box, ChartKind::Area, ChartKind::Violin] {
            assert_eq!(
                find(&results, kind),
                &Eligibility::Eligible(ChartSpec { kind, binding: Binding::Xy { x: 0, y: 1 } })
            );
        }
        assert_eq!(
            find(&results, ChartKind::Treemap),
            &Eligibility::Eligible(ChartSpec {
                kind: ChartKind::Treemap,
                binding: Binding::Hierarchy { path: smallvec![0], values: 1 },
            })
        );
    }
}
