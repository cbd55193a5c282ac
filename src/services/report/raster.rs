use std::f64::consts::{FRAC_PI_2, TAU};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::services::charts::types::{
    DistributionGroup, Figure, HierarchyNode, HierarchyStyle, SankeyLink, SeriesMode,
};
use crate::services::charts::ChartArtifact;
use crate::services::stats::Bin;

/// An RGB8 bitmap of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Turns a chart into a static image. Failure means image export does not
/// work in this environment at all, not that one chart is bad.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, artifact: &ChartArtifact) -> anyhow::Result<Raster>;
}

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

const PALETTE: [RGBColor; 10] = [
    RGBColor(59, 130, 246),
    RGBColor(16, 185, 129),
    RGBColor(245, 158, 11),
    RGBColor(244, 63, 94),
    RGBColor(139, 92, 246),
    RGBColor(236, 72, 153),
    RGBColor(20, 184, 166),
    RGBColor(249, 115, 22),
    RGBColor(132, 204, 22),
    RGBColor(100, 116, 139),
];
const FONT: &str = "sans-serif";
const MAX_LABEL_CHARS: usize = 18;

pub struct PlottersRasterizer {
    width: u32,
    height: u32,
}

impl PlottersRasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Rasterizer for PlottersRasterizer {
    fn rasterize(&self, artifact: &ChartArtifact) -> anyhow::Result<Raster> {
        let mut pixels = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (self.width, self.height))
                .into_drawing_area();
            draw_artifact(&root, artifact)?;
            root.present()?;
        }
        Ok(Raster { width: self.width, height: self.height, pixels })
    }
}

fn draw_artifact<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, artifact: &ChartArtifact) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let area = root.titled(&artifact.title, (FONT, 26).into_font())?;

    match &artifact.figure {
        Figure::Bars { x_label, y_label, labels, values } => draw_bars(&area, x_label, y_label, labels, values),
        Figure::Pie { labels, values } => draw_pie(&area, labels, values),
        Figure::Histogram { x_label, bins } => draw_histogram(&area, x_label, bins),
        Figure::Sankey { nodes, links } => draw_sankey(&area, nodes, links),
        Figure::Hierarchy { style: HierarchyStyle::Treemap, nodes } => draw_treemap(&area, nodes),
        Figure::Hierarchy { style: HierarchyStyle::Sunburst, nodes } => draw_sunburst(&area, nodes),
        Figure::Series { mode, x_label, y_label, x_categories, points } => {
            draw_xy(&area, *mode, x_label, y_label, x_categories.as_deref(), points)
        }
        Figure::Distribution { x_label, y_label, groups } => draw_distribution(&area, x_label, y_label, groups),
        Figure::Heatmap { labels, matrix } => draw_heatmap(&area, labels, matrix),
    }
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{}…", head)
    }
}

/// Label for a tick that sits on a category position; blank between positions.
fn category_label(categories: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).map(|c| truncate(c)).unwrap_or_default()
}

fn padded(min: f64, max: f64) -> std::ops::Range<f64> {
    if min == max {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    x_label: &str,
    y_label: &str,
    labels: &[String],
    values: &[f64],
) -> DrawResult<DB> {
    let n = labels.len().max(1);
    let top = values.iter().copied().fold(0.0f64, f64::max).max(1.0) * 1.1;
    let label_fmt = |x: &f64| category_label(labels, *x);

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&label_fmt)
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *v)], PALETTE[0].filled())
    }))?;
    Ok(())
}

fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 + radius * angle.sin()).round() as i32,
    )
}

/// Outline of a ring segment; an inner radius of zero gives a pie wedge.
fn ring_segment(center: (f64, f64), inner: f64, outer: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep.abs() / 0.03).ceil() as usize).max(2);
    let at = |s: usize| start + sweep * s as f64 / steps as f64;

    let mut points: Vec<(i32, i32)> = (0..=steps).map(|s| polar(center, outer, at(s))).collect();
    if inner <= 0.0 {
        points.push(polar(center, 0.0, 0.0));
    } else {
        points.extend((0..=steps).rev().map(|s| polar(center, inner, at(s))));
    }
    points
}

fn draw_pie<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, labels: &[String], values: &[f64]) -> DrawResult<DB> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Ok(());
    }
    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = w.min(h) as f64 * 0.35;

    let mut start = -FRAC_PI_2;
    for (i, (label, value)) in labels.iter().zip(values).enumerate() {
        let sweep = value / total * TAU;
        let color = PALETTE[i % PALETTE.len()];
        area.draw(&Polygon::new(ring_segment(center, 0.0, radius, start, sweep), color.filled()))?;

        let anchor = polar(center, radius * 1.12, start + sweep / 2.0);
        let text = format!("{} ({:.1}%)", truncate(label), value / total * 100.0);
        area.draw(&Text::new(text, anchor, (FONT, 16).into_font()))?;
        start += sweep;
    }
    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, x_label: &str, bins: &[Bin]) -> DrawResult<DB> {
    let lo = bins.first().map_or(0.0, |b| b.start);
    let hi = bins.last().map_or(1.0, |b| b.end);
    let top = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0f64..top)?;

    chart.configure_mesh().x_desc(x_label).y_desc("count").draw()?;

    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], PALETTE[0].mix(0.85).filled())
    }))?;
    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
    }))?;
    Ok(())
}

fn draw_xy<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    mode: SeriesMode,
    x_label: &str,
    y_label: &str,
    x_categories: Option<&[String]>,
    points: &[(f64, f64)],
) -> DrawResult<DB> {
    let fold = |f: fn(f64, f64) -> f64, init: f64, pick: fn(&(f64, f64)) -> f64| {
        points.iter().map(pick).fold(init, f)
    };
    let x_range = match x_categories {
        Some(categories) => -0.5..(categories.len().max(1) as f64 - 0.5),
        None => padded(fold(f64::min, f64::INFINITY, |p| p.0), fold(f64::max, f64::NEG_INFINITY, |p| p.0)),
    };
    let (mut y_min, mut y_max) = (fold(f64::min, f64::INFINITY, |p| p.1), fold(f64::max, f64::NEG_INFINITY, |p| p.1));
    if mode == SeriesMode::Area {
        y_min = y_min.min(0.0);
        y_max = y_max.max(0.0);
    }

    let categories = x_categories.unwrap_or(&[]);
    let label_fmt = |x: &f64| category_label(categories, *x);

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, padded(y_min, y_max))?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(x_label).y_desc(y_label);
    if x_categories.is_some() {
        mesh.x_labels(categories.len().clamp(1, 20)).x_label_formatter(&label_fmt);
    }
    mesh.draw()?;

    let color = PALETTE[0];
    match mode {
        SeriesMode::Line => {
            chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
        }
        SeriesMode::Area => {
            chart.draw_series(
                AreaSeries::new(points.iter().copied(), 0.0, color.mix(0.3).filled())
                    .border_style(color.stroke_width(2)),
            )?;
        }
        SeriesMode::Markers => {
            chart.draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 4, color.filled())))?;
        }
    }
    Ok(())
}

fn draw_distribution<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    x_label: &str,
    y_label: &str,
    groups: &[DistributionGroup],
) -> DrawResult<DB> {
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for group in groups {
        let s = &group.summary;
        let extremes = [s.lower_whisker, s.upper_whisker]
            .into_iter()
            .chain(s.outliers.iter().copied())
            .chain(group.density.iter().flatten().map(|(y, _)| *y));
        for v in extremes {
            y_min = y_min.min(v);
            y_max = y_max.max(v);
        }
    }
    if !y_min.is_finite() {
        return Ok(());
    }

    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();
    let label_fmt = |x: &f64| category_label(&labels, *x);

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(groups.len() as f64 - 0.5), padded(y_min, y_max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(groups.len().clamp(1, 20))
        .x_label_formatter(&label_fmt)
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()?;

    for (i, group) in groups.iter().enumerate() {
        let x = i as f64;
        let color = PALETTE[i % PALETTE.len()];
        let s = &group.summary;

        let half = match &group.density {
            Some(density) => {
                let peak = density.iter().map(|(_, d)| *d).fold(0.0f64, f64::max);
                if peak > 0.0 {
                    let mut outline: Vec<(f64, f64)> =
                        density.iter().map(|(y, d)| (x + d / peak * 0.4, *y)).collect();
                    outline.extend(density.iter().rev().map(|(y, d)| (x - d / peak * 0.4, *y)));
                    chart.draw_series(std::iter::once(Polygon::new(outline, color.mix(0.35).filled())))?;
                }
                0.06
            }
            None => 0.25,
        };

        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - half, s.q1), (x + half, s.q3)],
            color.mix(0.6).filled(),
        )))?;
        chart.draw_series([
            PathElement::new(vec![(x - half, s.median), (x + half, s.median)], BLACK.stroke_width(2)),
            PathElement::new(vec![(x, s.lower_whisker), (x, s.q1)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x, s.q3), (x, s.upper_whisker)], BLACK.stroke_width(1)),
        ])?;
        chart.draw_series(s.outliers.iter().map(|&y| Circle::new((x, y), 3, color.filled())))?;
    }
    Ok(())
}

/// Red for -1, near-white for 0, blue for +1; grey when undefined.
fn diverging(value: Option<f64>) -> RGBColor {
    const NEG: (f64, f64, f64) = (178.0, 24.0, 43.0);
    const MID: (f64, f64, f64) = (247.0, 247.0, 247.0);
    const POS: (f64, f64, f64) = (33.0, 102.0, 172.0);

    let Some(v) = value else {
        return RGBColor(220, 220, 220);
    };
    let v = v.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 { (MID, NEG, -v) } else { (MID, POS, v) };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    labels: &[String],
    matrix: &[Vec<Option<f64>>],
) -> DrawResult<DB> {
    let n = labels.len().max(1);
    let last = n as f64 - 1.0;
    let x_fmt = |x: &f64| category_label(labels, *x);
    let y_fmt = |y: &f64| category_label(labels, last - *y);

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(120)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), -0.5f64..(n as f64 - 0.5))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .draw()?;

    let cells = matrix.iter().enumerate().flat_map(|(row, values)| {
        values.iter().enumerate().map(move |(col, v)| (col as f64, last - row as f64, *v))
    });
    let cells: Vec<(f64, f64, Option<f64>)> = cells.collect();

    chart.draw_series(cells.iter().map(|&(x, y, v)| {
        Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], diverging(v).filled())
    }))?;
    chart.draw_series(cells.iter().filter_map(|&(x, y, v)| {
        v.map(|v| Text::new(format!("{:.2}", v), (x - 0.12, y + 0.05), (FONT, 15).into_font()))
    }))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NodeBox {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

/// Column depth of each node: longest chain of links leading into it.
/// Cycles are cut off once a depth reaches the node count.
fn sankey_depths(node_count: usize, links: &[SankeyLink]) -> Vec<usize> {
    let mut depth = vec![0usize; node_count];
    for _ in 0..node_count {
        let mut changed = false;
        for link in links {
            let next = depth[link.source] + 1;
            if link.source != link.target && depth[link.target] < next && next < node_count {
                depth[link.target] = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    depth
}

const SANKEY_MARGIN: f64 = 20.0;
const SANKEY_NODE_WIDTH: f64 = 18.0;
const SANKEY_GAP: f64 = 12.0;

/// Node rectangles and the pixels-per-unit scale of link thickness.
fn sankey_layout(node_count: usize, links: &[SankeyLink], size: (u32, u32)) -> (Vec<NodeBox>, f64) {
    let (w, h) = (size.0 as f64, size.1 as f64);
    let depth = sankey_depths(node_count, links);

    let mut outflow = vec![0.0; node_count];
    let mut inflow = vec![0.0; node_count];
    for link in links {
        let value = link.value.max(0.0);
        outflow[link.source] += value;
        inflow[link.target] += value;
    }
    let sizes: Vec<f64> = (0..node_count).map(|i| f64::max(outflow[i], inflow[i])).collect();

    let columns = depth.iter().max().map_or(1, |d| d + 1);
    let mut column_total = vec![0.0; columns];
    let mut column_count = vec![0usize; columns];
    for (i, &d) in depth.iter().enumerate() {
        column_total[d] += sizes[i];
        column_count[d] += 1;
    }

    let usable = h - 2.0 * SANKEY_MARGIN;
    let scale = (0..columns)
        .filter(|&c| column_total[c] > 0.0)
        .map(|c| (usable - SANKEY_GAP * column_count[c].saturating_sub(1) as f64) / column_total[c])
        .fold(f64::INFINITY, f64::min);
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };

    let step = (w - 2.0 * SANKEY_MARGIN - SANKEY_NODE_WIDTH) / (columns.max(2) - 1) as f64;
    let mut cursor = vec![SANKEY_MARGIN; columns];
    let boxes = (0..node_count)
        .map(|i| {
            let d = depth[i];
            let x0 = SANKEY_MARGIN + step * d as f64;
            let y0 = cursor[d];
            let y1 = y0 + (sizes[i] * scale).max(2.0);
            cursor[d] = y1 + SANKEY_GAP;
            NodeBox { x0, y0, x1: x0 + SANKEY_NODE_WIDTH, y1 }
        })
        .collect();

    (boxes, scale)
}

fn draw_sankey<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    nodes: &[String],
    links: &[SankeyLink],
) -> DrawResult<DB> {
    let (boxes, scale) = sankey_layout(nodes.len(), links, area.dim_in_pixel());
    let mut out_offset = vec![0.0; nodes.len()];
    let mut in_offset = vec![0.0; nodes.len()];

    for link in links.iter().filter(|l| l.value > 0.0) {
        let (src, dst) = (boxes[link.source], boxes[link.target]);
        let thickness = link.value * scale;
        let sy = src.y0 + out_offset[link.source];
        let ty = dst.y0 + in_offset[link.target];
        out_offset[link.source] += thickness;
        in_offset[link.target] += thickness;

        let quad = vec![
            (src.x1 as i32, sy as i32),
            (dst.x0 as i32, ty as i32),
            (dst.x0 as i32, (ty + thickness) as i32),
            (src.x1 as i32, (sy + thickness) as i32),
        ];
        let color = PALETTE[link.source % PALETTE.len()];
        area.draw(&Polygon::new(quad, color.mix(0.3).filled()))?;
    }

    for (i, (label, b)) in nodes.iter().zip(&boxes).enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        area.draw(&Rectangle::new(
            [(b.x0 as i32, b.y0 as i32), (b.x1 as i32, b.y1 as i32)],
            color.filled(),
        ))?;
        area.draw(&Text::new(
            truncate(label),
            ((b.x1 + 4.0) as i32, b.y0 as i32),
            (FONT, 14).into_font(),
        ))?;
    }
    Ok(())
}

fn children_of(nodes: &[HierarchyNode]) -> (Vec<usize>, Vec<Vec<usize>>) {
    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        match node.parent {
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }
    (roots, children)
}

fn root_of(nodes: &[HierarchyNode]) -> Vec<usize> {
    let mut roots = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let root = node.parent.map_or(i, |p| roots[p]);
        roots.push(root);
    }
    roots
}

const TREEMAP_LABEL_HEIGHT: f64 = 18.0;
const TREEMAP_PADDING: f64 = 3.0;

/// Slice-and-dice layout: siblings split their parent's box along
/// alternating axes in proportion to their values.
fn treemap_layout(nodes: &[HierarchyNode], bounds: NodeBox) -> Vec<Option<NodeBox>> {
    fn place(
        ids: &[usize],
        bounds: NodeBox,
        depth: usize,
        nodes: &[HierarchyNode],
        children: &[Vec<usize>],
        out: &mut [Option<NodeBox>],
    ) {
        let total: f64 = ids.iter().map(|&i| nodes[i].value).sum();
        if total <= 0.0 {
            return;
        }
        let horizontal = depth % 2 == 0;
        let mut offset = 0.0;
        for &id in ids {
            let share = nodes[id].value / total;
            let b = if horizontal {
                let width = (bounds.x1 - bounds.x0) * share;
                NodeBox { x0: bounds.x0 + offset, y0: bounds.y0, x1: bounds.x0 + offset + width, y1: bounds.y1 }
            } else {
                let height = (bounds.y1 - bounds.y0) * share;
                NodeBox { x0: bounds.x0, y0: bounds.y0 + offset, x1: bounds.x1, y1: bounds.y0 + offset + height }
            };
            offset += if horizontal { b.x1 - b.x0 } else { b.y1 - b.y0 };
            out[id] = Some(b);

            let inner = NodeBox {
                x0: b.x0 + TREEMAP_PADDING,
                y0: b.y0 + TREEMAP_LABEL_HEIGHT,
                x1: b.x1 - TREEMAP_PADDING,
                y1: b.y1 - TREEMAP_PADDING,
            };
            if inner.x1 > inner.x0 && inner.y1 > inner.y0 {
                place(&children[id], inner, depth + 1, nodes, children, out);
            }
        }
    }

    let (roots, children) = children_of(nodes);
    let mut out = vec![None; nodes.len()];
    place(&roots, bounds, 0, nodes, &children, &mut out);
    out
}

fn draw_treemap<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, nodes: &[HierarchyNode]) -> DrawResult<DB> {
    let (w, h) = area.dim_in_pixel();
    let bounds = NodeBox { x0: 10.0, y0: 10.0, x1: w as f64 - 10.0, y1: h as f64 - 10.0 };
    let layout = treemap_layout(nodes, bounds);
    let roots = root_of(nodes);

    for (i, (node, placed)) in nodes.iter().zip(&layout).enumerate() {
        let Some(b) = placed else { continue };
        let color = PALETTE[roots[i] % PALETTE.len()].mix((1.0 - 0.25 * node.depth as f64).max(0.3));
        let corners = [(b.x0 as i32, b.y0 as i32), (b.x1 as i32, b.y1 as i32)];
        area.draw(&Rectangle::new(corners, color.filled()))?;
        area.draw(&Rectangle::new(corners, WHITE.stroke_width(2)))?;
        if b.x1 - b.x0 > 40.0 && b.y1 - b.y0 > TREEMAP_LABEL_HEIGHT {
            area.draw(&Text::new(
                truncate(&node.label),
                ((b.x0 + 4.0) as i32, (b.y0 + 3.0) as i32),
                (FONT, 14).into_font(),
            ))?;
        }
    }
    Ok(())
}

/// Start angle and sweep of every node; roots share the full circle.
fn sunburst_spans(nodes: &[HierarchyNode]) -> Vec<Option<(f64, f64)>> {
    let (roots, children) = children_of(nodes);
    let mut spans = vec![None; nodes.len()];

    let mut pending: Vec<(Vec<usize>, f64, f64)> = vec![(roots, -FRAC_PI_2, TAU)];
    while let Some((ids, start, sweep)) = pending.pop() {
        let total: f64 = ids.iter().map(|&i| nodes[i].value).sum();
        if total <= 0.0 {
            continue;
        }
        let mut angle = start;
        for id in ids {
            let share = sweep * nodes[id].value / total;
            spans[id] = Some((angle, share));
            if !children[id].is_empty() {
                // Children fill their parent's span only as far as their own values reach.
                let child_total: f64 = children[id].iter().map(|&c| nodes[c].value).sum();
                let child_sweep = share * (child_total / nodes[id].value).min(1.0);
                pending.push((children[id].clone(), angle, child_sweep));
            }
            angle += share;
        }
    }
    spans
}

fn draw_sunburst<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, nodes: &[HierarchyNode]) -> DrawResult<DB> {
    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let rings = nodes.iter().map(|n| n.depth + 1).max().unwrap_or(1) as f64;
    let ring = w.min(h) as f64 * 0.45 / rings;
    let spans = sunburst_spans(nodes);
    let roots = root_of(nodes);

    for (i, (node, span)) in nodes.iter().zip(&spans).enumerate() {
        let Some((start, sweep)) = *span else { continue };
        let inner = ring * node.depth as f64;
        let outer = inner + ring;
        let color = PALETTE[roots[i] % PALETTE.len()].mix((1.0 - 0.2 * node.depth as f64).max(0.35));
        let outline = ring_segment(center, inner, outer, start, sweep);
        area.draw(&Polygon::new(outline.clone(), color.filled()))?;
        area.draw(&PathElement::new(outline, WHITE.stroke_width(1)))?;

        if sweep * (inner + ring / 2.0) > 40.0 {
            let anchor = polar(center, inner + ring * 0.3, start + sweep / 2.0);
            area.draw(&Text::new(truncate(&node.label), anchor, (FONT, 13).into_font()))?;
        }
    }
    Ok(())
}
