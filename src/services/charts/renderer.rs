use std::collections::HashMap;

use crate::services::dataset::Dataset;
use crate::services::dataset::utils::value_counts;
use crate::services::stats::{self, BoxSummary};
use super::types::*;

const KDE_POINTS: usize = 64;

/// Data that a chart cannot be drawn from. Surfaced as a warning, never fatal.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RenderError {
    #[error("'{0}' has no values to plot")]
    NoData(String),
    #[error("'{0}' must be numeric")]
    NotNumeric(String),
    #[error("'{0}' contains missing labels, which cannot be placed in a hierarchy")]
    MissingPath(String),
    #[error("'{0}' contains negative values")]
    NegativeValue(String),
    #[error("values in '{0}' sum to zero")]
    ZeroTotal(String),
    #[error("binding refers to column {0}, which does not exist")]
    MissingColumn(usize),
}

/// Builds the figure for one chart from the columns its `ChartSpec` binds.
pub fn render(spec: &ChartSpec, dataset: &Dataset) -> Result<ChartArtifact, RenderError> {
    if let Some(&missing) = spec.binding.columns().iter().find(|&&idx| idx >= dataset.width()) {
        return Err(RenderError::MissingColumn(missing));
    }

    let name = |idx: usize| dataset.name(idx).unwrap_or_default().to_string();

    let figure = match (&spec.binding, spec.kind) {
        (Binding::ValueCounts { column, top }, ChartKind::Pie) => {
            let (labels, values) = top_counts(dataset, *column, *top);
            Figure::Pie { labels, values }
        }
        (Binding::ValueCounts { column, top }, _) => {
            let (labels, values) = top_counts(dataset, *column, *top);
            Figure::Bars { x_label: name(*column), y_label: "Count".to_string(), labels, values }
        }
        (Binding::Distribution { column }, _) => {
            let values = stats::present(&numeric(dataset, *column)?);
            if values.is_empty() {
                return Err(RenderError::NoData(name(*column)));
            }
            Figure::Histogram { x_label: name(*column), bins: stats::histogram(&values) }
        }
        (Binding::Flow { source, target, value }, _) => sankey(dataset, *source, *target, *value)?,
        (Binding::Hierarchy { path, values }, kind) => {
            let style = if kind == ChartKind::Sunburst {
                HierarchyStyle::Sunburst
            } else {
                HierarchyStyle::Treemap
            };
            Figure::Hierarchy { style, nodes: hierarchy(dataset, path, *values)? }
        }
        (Binding::Xy { x, y }, ChartKind::Box) => distribution(dataset, *x, *y, false)?,
        (Binding::Xy { x, y }, ChartKind::Violin) => distribution(dataset, *x, *y, true)?,
        (Binding::Xy { x, y }, kind) => {
            let mode = match kind {
                ChartKind::Area => SeriesMode::Area,
                ChartKind::Scatter => SeriesMode::Markers,
                _ => SeriesMode::Line,
            };
            series(dataset, *x, *y, mode)?
        }
        (Binding::Correlation { columns }, _) => {
            let data: Vec<Vec<Option<f64>>> = columns
                .iter()
                .map(|&idx| numeric(dataset, idx))
                .collect::<Result<_, _>>()?;
            let matrix = data
                .iter()
                .map(|row| data.iter().map(|col| stats::pearson(row, col)).collect())
                .collect();
            Figure::Heatmap { labels: columns.iter().map(|&idx| name(idx)).collect(), matrix }
        }
    };

    let title = match spec.kind {
        ChartKind::Heatmap => "Correlation Heatmap".to_string(),
        kind => format!("{}: {}", kind.title(), bound_names(dataset, &spec.binding)),
    };

    Ok(ChartArtifact { kind: spec.kind, title, figure })
}

fn bound_names(dataset: &Dataset, binding: &Binding) -> String {
    binding
        .columns()
        .iter()
        .filter_map(|&idx| dataset.name(idx))
        .collect::<Vec<_>>()
        .join(" / ")
}

fn numeric(dataset: &Dataset, idx: usize) -> Result<Vec<Option<f64>>, RenderError> {
    if !dataset.is_numeric(idx) {
        return Err(RenderError::NotNumeric(dataset.name(idx).unwrap_or_default().to_string()));
    }
    Ok(dataset.numbers(idx))
}

fn top_counts(dataset: &Dataset, column: usize, top: usize) -> (Vec<String>, Vec<f64>) {
    value_counts(&dataset.labels(column))
        .into_iter()
        .take(top)
        .map(|(label, count)| (label, count as f64))
        .unzip()
}

fn sankey(dataset: &Dataset, source: usize, target: usize, value: usize) -> Result<Figure, RenderError> {
    let sources = dataset.labels(source);
    let targets = dataset.labels(target);
    let values = numeric(dataset, value)?;

    let mut nodes: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut node_id = |label: &Option<String>| -> usize {
        let label = label.clone().unwrap_or_else(|| "nan".to_string());
        *index.entry(label.clone()).or_insert_with(|| {
            nodes.push(label);
            nodes.len() - 1
        })
    };

    // Sources are registered before targets so the node list follows first appearance per side.
    let source_ids: Vec<usize> = sources.iter().map(&mut node_id).collect();
    let target_ids: Vec<usize> = targets.iter().map(&mut node_id).collect();

    let links = source_ids
        .into_iter()
        .zip(target_ids)
        .zip(values)
        .map(|((source, target), value)| SankeyLink { source, target, value: value.unwrap_or(1.0) })
        .collect();

    Ok(Figure::Sankey { nodes, links })
}

fn hierarchy(dataset: &Dataset, path: &[usize], values_col: usize) -> Result<Vec<HierarchyNode>, RenderError> {
    let values = numeric(dataset, values_col)?;
    let labels: Vec<Vec<Option<String>>> = path.iter().map(|&idx| dataset.labels(idx)).collect();

    let mut nodes: Vec<HierarchyNode> = Vec::new();
    let mut index: HashMap<(Option<usize>, String), usize> = HashMap::new();

    for (row, value) in values.iter().enumerate() {
        let value = value.unwrap_or(0.0);
        if value < 0.0 {
            return Err(RenderError::NegativeValue(dataset.name(values_col).unwrap_or_default().to_string()));
        }

        let mut parent = None;
        for (depth, column) in labels.iter().enumerate() {
            let Some(label) = column[row].clone() else {
                return Err(RenderError::MissingPath(dataset.name(path[depth]).unwrap_or_default().to_string()));
            };
            let id = *index.entry((parent, label.clone())).or_insert_with(|| {
                nodes.push(HierarchyNode { label, parent, depth, value: 0.0 });
                nodes.len() - 1
            });
            nodes[id].value += value;
            parent = Some(id);
        }
    }

    let total: f64 = nodes.iter().filter(|n| n.parent.is_none()).map(|n| n.value).sum();
    if total <= 0.0 {
        return Err(RenderError::ZeroTotal(dataset.name(values_col).unwrap_or_default().to_string()));
    }
    Ok(nodes)
}

/// Maps each present label to a position by first appearance.
fn category_positions(labels: &[Option<String>]) -> (Vec<String>, Vec<Option<f64>>) {
    let mut categories: Vec<String> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let positions = labels
        .iter()
        .map(|label| {
            let label = label.as_deref()?;
            let pos = *index.entry(label).or_insert_with(|| {
                categories.push(label.to_string());
                categories.len() - 1
            });
            Some(pos as f64)
        })
        .collect();
    (categories, positions)
}

fn series(dataset: &Dataset, x: usize, y: usize, mode: SeriesMode) -> Result<Figure, RenderError> {
    let ys = numeric(dataset, y)?;
    let (x_categories, xs) = if dataset.is_numeric(x) {
        (None, dataset.numbers(x))
    } else {
        let (categories, positions) = category_positions(&dataset.labels(x));
        (Some(categories), positions)
    };

    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(&ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if points.is_empty() {
        return Err(RenderError::NoData(dataset.name(y).unwrap_or_default().to_string()));
    }

    Ok(Figure::Series {
        mode,
        x_label: dataset.name(x).unwrap_or_default().to_string(),
        y_label: dataset.name(y).unwrap_or_default().to_string(),
        x_categories,
        points,
    })
}

fn distribution(dataset: &Dataset, x: usize, y: usize, with_density: bool) -> Result<Figure, RenderError> {
    let ys = numeric(dataset, y)?;
    let (categories, positions) = category_positions(&dataset.labels(x));

    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); categories.len()];
    for (pos, value) in positions.iter().zip(&ys) {
        if let (Some(pos), Some(value)) = (pos, value) {
            buckets[*pos as usize].push(*value);
        }
    }

    let groups: Vec<DistributionGroup> = categories
        .into_iter()
        .zip(buckets)
        .filter_map(|(label, values)| {
            let summary = BoxSummary::from_values(&values)?;
            let density = with_density.then(|| stats::kde(&values, KDE_POINTS));
            Some(DistributionGroup { label, summary, density })
        })
        .collect();
    if groups.is_empty() {
        return Err(RenderError::NoData(dataset.name(y).unwrap_or_default().to_string()));
    }

    Ok(Figure::Distribution {
        x_label: dataset.name(x).unwrap_or_default().to_string(),
        y_label: dataset.name(y).unwrap_or_default().to_string(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use smallvec::smallvec;

    fn spec(kind: ChartKind, binding: Binding) -> ChartSpec {
        ChartSpec { kind, binding }
    }

    fn flows() -> Dataset {
        Dataset::new(vec![
            Series::new("from", &["a", "a", "b", "c"]),
            Series::new("to", &["b", "c", "c", "a"]),
            Series::new("weight", &[Some(5.0), None, Some(2.0), None]),
        ])
        .unwrap()
    }

    #[test]
    fn bar_keeps_ten_most_frequent_and_pie_five() {
        let labels: Vec<String> = (0..12)
            .flat_map(|i| std::iter::repeat(format!("v{}", i)).take(12 - i))
            .collect();
        let dataset = Dataset::new(vec![Series::new("value", labels)]).unwrap();

        let bar = render(&spec(ChartKind::Bar, Binding::ValueCounts { column: 0, top: 10 }), &dataset).unwrap();
        let Figure::Bars { labels, values, y_label, .. } = bar.figure else { panic!("expected bars") };
        assert_eq!(labels.len(), 10);
        assert_eq!(labels[0], "v0");
        assert_eq!(values[0], 12.0);
        assert_eq!(y_label, "Count");

        let pie = render(&spec(ChartKind::Pie, Binding::ValueCounts { column: 0, top: 5 }), &dataset).unwrap();
        let Figure::Pie { labels, .. } = pie.figure else { panic!("expected pie") };
        assert_eq!(labels, vec!["v0", "v1", "v2", "v3", "v4"]);
    }

    #[test]
    fn sankey_missing_values_count_as_one() {
        let binding = Binding::Flow { source: 0, target: 1, value: 2 };
        let artifact = render(&spec(ChartKind::Sankey, binding), &flows()).unwrap();
        let Figure::Sankey { nodes, links } = artifact.figure else { panic!("expected sankey") };

        assert_eq!(nodes, vec!["a", "b", "c"]);
        let values: Vec<f64> = links.iter().map(|l| l.value).collect();
        assert_eq!(values, vec![5.0, 1.0, 2.0, 1.0]);
        assert_eq!((links[3].source, links[3].target), (2, 0));
    }

    #[test]
    fn sankey_rejects_text_values() {
        let dataset = Dataset::new(vec![
            Series::new("from", &["a"]),
            Series::new("to", &["b"]),
            Series::new("note", &["heavy"]),
        ])
        .unwrap();
        let binding = Binding::Flow { source: 0, target: 1, value: 2 };
        assert_eq!(
            render(&spec(ChartKind::Sankey, binding), &dataset),
            Err(RenderError::NotNumeric("note".to_string()))
        );
    }

    #[test]
    fn sunburst_sums_leaves_into_parents() {
        let dataset = Dataset::new(vec![
            Series::new("region", &["eu", "eu", "us"]),
            Series::new("city", &["paris", "rome", "nyc"]),
            Series::new("sales", &[2.0, 3.0, 5.0]),
        ])
        .unwrap();
        let binding = Binding::Hierarchy { path: smallvec![0, 1, 2], values: 2 };
        let artifact = render(&spec(ChartKind::Sunburst, binding), &dataset).unwrap();
        let Figure::Hierarchy { style, nodes } = artifact.figure else { panic!("expected hierarchy") };

        assert_eq!(style, HierarchyStyle::Sunburst);
        let eu = nodes.iter().find(|n| n.label == "eu").unwrap();
        assert_eq!((eu.depth, eu.value, eu.parent), (0, 5.0, None));
        let leaves = nodes.iter().filter(|n| n.depth == 2).count();
        assert_eq!(leaves, 3);
        assert!(nodes.iter().all(|n| n.parent.map_or(true, |p| p < nodes.len())));
    }

    #[test]
    fn sunburst_with_text_values_is_soft_failure() {
        let dataset = Dataset::new(vec![
            Series::new("a", &["x"]),
            Series::new("b", &["y"]),
            Series::new("c", &["z"]),
        ])
        .unwrap();
        let binding = Binding::Hierarchy { path: smallvec![0, 1, 2], values: 2 };
        let err = render(&spec(ChartKind::Sunburst, binding), &dataset).unwrap_err();
        assert_eq!(err.to_string(), "'c' must be numeric");
    }

    #[test]
    fn hierarchy_rejects_missing_labels() {
        let dataset = Dataset::new(vec![
            Series::new("group", &[Some("x"), None]),
            Series::new("amount", &[1.0, 2.0]),
        ])
        .unwrap();
        let binding = Binding::Hierarchy { path: smallvec![0], values: 1 };
        assert_eq!(
            render(&spec(ChartKind::Treemap, binding), &dataset),
            Err(RenderError::MissingPath("group".to_string()))
        );
    }

    #[test]
    fn categorical_x_maps_to_positions() {
        let dataset = Dataset::new(vec![
            Series::new("day", &[Some("mon"), Some("tue"), Some("mon"), None]),
            Series::new("visits", &[Some(3.0), None, Some(4.0), Some(1.0)]),
        ])
        .unwrap();
        let artifact = render(&spec(ChartKind::Line, Binding::Xy { x: 0, y: 1 }), &dataset).unwrap();
        let Figure::Series { mode, x_categories, points, .. } = artifact.figure else { panic!("expected series") };
        assert_eq!(mode, SeriesMode::Line);
        assert_eq!(x_categories, Some(vec!["mon".to_string(), "tue".to_string()]));
        assert_eq!(points, vec![(0.0, 3.0), (0.0, 4.0)]);
    }

    #[test]
    fn violin_groups_carry_density() {
        let dataset = Dataset::new(vec![
            Series::new("team", &["a", "a", "b", "b"]),
            Series::new("score", &[1.0, 2.0, 3.0, 5.0]),
        ])
        .unwrap();
        let artifact = render(&spec(ChartKind::Violin, Binding::Xy { x: 0, y: 1 }), &dataset).unwrap();
        let Figure::Distribution { groups, .. } = artifact.figure else { panic!("expected distribution") };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].summary.median, 4.0);
        assert_eq!(groups[0].density.as_ref().map(Vec::len), Some(KDE_POINTS));

        let boxed = render(&spec(ChartKind::Box, Binding::Xy { x: 0, y: 1 }), &dataset).unwrap();
        let Figure::Distribution { groups, .. } = boxed.figure else { panic!("expected distribution") };
        assert!(groups.iter().all(|g| g.density.is_none()));
    }

    #[test]
    fn heatmap_is_symmetric() {
        let dataset = Dataset::new(vec![
            Series::new("x", &[1.0, 2.0, 3.0]),
            Series::new("y", &[3.0, 2.0, 1.0]),
        ])
        .unwrap();
        let artifact = render(&spec(ChartKind::Heatmap, Binding::Correlation { columns: vec![0, 1] }), &dataset).unwrap();
        assert_eq!(artifact.title, "Correlation Heatmap");
        let Figure::Heatmap { labels, matrix } = artifact.figure else { panic!("expected heatmap") };
        assert_eq!(labels, vec!["x", "y"]);
        assert!((matrix[0][1].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(matrix[0][1], matrix[1][0]);
    }

    #[test]
    fn histogram_without_values_is_soft_failure() {
        let dataset = Dataset::new(vec![
            Series::new("a", &["x", "y"]),
            Series::new("b", &[None::<f64>, None]),
        ])
        .unwrap();
        assert_eq!(
            render(&spec(ChartKind::Histogram, Binding::Distribution { column: 1 }), &dataset),
            Err(RenderError::NoData("b".to_string()))
        );
    }

    #[test]
    fn out_of_range_binding_is_reported() {
        assert_eq!(
            render(&spec(ChartKind::Scatter, Binding::Xy { x: 0, y: 7 }), &flows()),
            Err(RenderError::MissingColumn(7))
        );
    }
}
