use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use smallvec::{smallvec, SmallVec};

use crate::error::AppError;
use crate::services::stats::{Bin, BoxSummary};

pub type Columns = SmallVec<[usize; 3]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Histogram,
    Sankey,
    Sunburst,
    Line,
    Box,
    Area,
    Heatmap,
    Scatter,
    Violin,
    Treemap,
}

/// What a dataset must look like before a chart kind can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition {
    pub min_columns: usize,
    /// Column positions that must hold numeric values.
    pub numeric_positions: &'static [usize],
    /// Numeric columns required anywhere in the dataset.
    pub min_numeric_columns: usize,
}

impl ChartKind {
    pub const ALL: [ChartKind; 12] = [
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Histogram,
        ChartKind::Sankey,
        ChartKind::Sunburst,
        ChartKind::Line,
        ChartKind::Box,
        ChartKind::Area,
        ChartKind::Heatmap,
        ChartKind::Scatter,
        ChartKind::Violin,
        ChartKind::Treemap,
    ];

    /// Kinds drawn as soon as a dataset is loaded.
    pub const ALWAYS_ON: [ChartKind; 3] = [ChartKind::Bar, ChartKind::Pie, ChartKind::Histogram];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Histogram => "histogram",
            ChartKind::Sankey => "sankey",
            ChartKind::Sunburst => "sunburst",
            ChartKind::Line => "line",
            ChartKind::Box => "box",
            ChartKind::Area => "area",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Scatter => "scatter",
            ChartKind::Violin => "violin",
            ChartKind::Treemap => "treemap",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Histogram => "Histogram",
            ChartKind::Sankey => "Sankey Diagram",
            ChartKind::Sunburst => "Sunburst Chart",
            ChartKind::Line => "Line chart",
            ChartKind::Box => "Box plot",
            ChartKind::Area => "Area chart",
            ChartKind::Heatmap => "Heatmap",
            ChartKind::Scatter => "Scatter plot",
            ChartKind::Violin => "Violin plot",
            ChartKind::Treemap => "Treemap",
        }
    }

    pub fn precondition(self) -> Precondition {
        const NONE: &[usize] = &[];
        const Y: &[usize] = &[1];
        const X_AND_Y: &[usize] = &[0, 1];
        let (min_columns, numeric_positions, min_numeric_columns) = match self {
            ChartKind::Bar | ChartKind::Pie => (1, NONE, 0),
            ChartKind::Histogram => (2, Y, 0),
            ChartKind::Sankey | ChartKind::Sunburst => (3, NONE, 0),
            ChartKind::Line
            | ChartKind::Box
            | ChartKind::Area
            | ChartKind::Violin
            | ChartKind::Treemap => (2, Y, 0),
            ChartKind::Heatmap => (0, NONE, 2),
            ChartKind::Scatter => (2, X_AND_Y, 0),
        };
        Precondition { min_columns, numeric_positions, min_numeric_columns }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| AppError::UnknownChart(s.to_string()))
    }
}

/// Which columns a chart reads, by position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Binding {
    ValueCounts { column: usize, top: usize },
    Distribution { column: usize },
    Flow { source: usize, target: usize, value: usize },
    Hierarchy { path: Columns, values: usize },
    Xy { x: usize, y: usize },
    Correlation { columns: Vec<usize> },
}

impl Binding {
    pub fn columns(&self) -> Columns {
        match self {
            Binding::ValueCounts { column, .. } | Binding::Distribution { column } => smallvec![*column],
            Binding::Flow { source, target, value } => smallvec![*source, *target, *value],
            Binding::Hierarchy { path, values } => {
                let mut cols = path.clone();
                if !cols.contains(values) {
                    cols.push(*values);
                }
                cols
            }
            Binding::Xy { x, y } => smallvec![*x, *y],
            Binding::Correlation { columns } => columns.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub binding: Binding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Eligibility {
    Eligible(ChartSpec),
    Rejected { kind: ChartKind, reason: String },
}

impl Eligibility {
    pub fn kind(&self) -> ChartKind {
        match self {
            Eligibility::Eligible(spec) => spec.kind,
            Eligibility::Rejected { kind, .. } => *kind,
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Eligibility::Eligible(_) => None,
            Eligibility::Rejected { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesMode {
    Line,
    Area,
    Markers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyStyle {
    Sunburst,
    Treemap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// One node of a sunburst or treemap. Parents always precede their children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub label: String,
    pub parent: Option<usize>,
    pub depth: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionGroup {
    pub label: String,
    pub summary: BoxSummary,
    /// Kernel density as (value, density) pairs; violins only.
    pub density: Option<Vec<(f64, f64)>>,
}

/// The plot data of a chart, ready to be drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Figure {
    Bars {
        x_label: String,
        y_label: String,
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Pie {
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Histogram {
        x_label: String,
        bins: Vec<Bin>,
    },
    Sankey {
        nodes: Vec<String>,
        links: Vec<SankeyLink>,
    },
    Hierarchy {
        style: HierarchyStyle,
        nodes: Vec<HierarchyNode>,
    },
    Series {
        mode: SeriesMode,
        x_label: String,
        y_label: String,
        /// Category names when the x axis is categorical; points then sit at
        /// the category's position.
        x_categories: Option<Vec<String>>,
        points: Vec<(f64, f64)>,
    },
    Distribution {
        x_label: String,
        y_label: String,
        groups: Vec<DistributionGroup>,
    },
    Heatmap {
        labels: Vec<String>,
        matrix: Vec<Vec<Option<f64>>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub title: String,
    pub figure: Figure,
}
