//! Chart-side statistics: binning, box summaries, densities and correlation.

use polars::prelude::*;
use serde::Serialize;

/// Present values only, in their original order.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn linear_quantile(ca: &Float64Chunked, q: f64) -> Option<f64> {
    ca.quantile(q, QuantileInterpolOptions::Linear).ok().flatten()
}

/// Pearson correlation over the rows where both values are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let (a, b): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    if a.len() < 2 {
        return None;
    }

    let a = Float64Chunked::from_vec("x", a);
    let b = Float64Chunked::from_vec("y", b);
    let da = &a - a.mean()?;
    let db = &b - b.mean()?;
    let sxy = (&da * &db).sum()?;
    let sxx = (&da * &da).sum()?;
    let syy = (&db * &db).sum()?;
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width bins, `ceil(sqrt(n))` of them capped at 50.
pub fn histogram(values: &[f64]) -> Vec<Bin> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![Bin { start: min - 0.5, end: max + 0.5, count: values.len() }];
    }

    let bins = ((values.len() as f64).sqrt().ceil() as usize).clamp(1, 50);
    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Quartiles plus Tukey whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let ca = Float64Chunked::from_slice("values", values);
        let q1 = linear_quantile(&ca, 0.25)?;
        let median = ca.median()?;
        let q3 = linear_quantile(&ca, 0.75)?;
        let sorted = sorted(values);
        let fence = 1.5 * (q3 - q1);
        let (lo_fence, hi_fence) = (q1 - fence, q3 + fence);

        let (inside, outliers): (Vec<f64>, Vec<f64>) = sorted
            .iter()
            .partition(|v| **v >= lo_fence && **v <= hi_fence);
        let lower_whisker = inside.first().copied().unwrap_or(q1);
        let upper_whisker = inside.last().copied().unwrap_or(q3);

        Some(Self { lower_whisker, q1, median, q3, upper_whisker, outliers })
    }
}

/// Gaussian kernel density sampled at `points` positions across the data range.
pub fn kde(values: &[f64], points: usize) -> Vec<(f64, f64)> {
    if values.is_empty() || points == 0 {
        return Vec::new();
    }
    let n = values.len() as f64;
    let ca = Float64Chunked::from_slice("values", values);
    let std = ca.std(1).filter(|s| s.is_finite()).unwrap_or(0.0);
    let iqr = linear_quantile(&ca, 0.75).unwrap_or(0.0) - linear_quantile(&ca, 0.25).unwrap_or(0.0);

    // Silverman's rule of thumb
    let spread = if iqr > 0.0 { std.min(iqr / 1.34) } else { std };
    let bandwidth = if spread > 0.0 {
        0.9 * spread * n.powf(-0.2)
    } else {
        1.0
    };

    let (Some(min), Some(max)) = (ca.min(), ca.max()) else {
        return Vec::new();
    };
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    (0..points)
        .map(|i| {
            let y = if points == 1 || min == max {
                min
            } else {
                min + (max - min) * i as f64 / (points - 1) as f64
            };
            let density: f64 = values
                .iter()
                .map(|v| (-0.5 * ((y - v) / bandwidth).powi(2)).exp())
                .sum();
            (y, density * norm)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_uses_pairwise_complete_rows() {
        let xs = [Some(1.0), Some(2.0), None, Some(3.0)];
        let ys = [Some(2.0), Some(4.0), Some(100.0), Some(6.0)];
        assert!((pearson(&xs, &ys).unwrap() - 1.0).abs() < 1e-12);

        let constant = [Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&constant, &ys), None);

        let inverse = [Some(3.0), Some(2.0), Some(9.0), Some(1.0)];
        assert!((pearson(&xs, &inverse).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);
    }

    #[test]
    fn histogram_covers_every_value() {
        let values: Vec<f64> = (0..10).map(f64::from).collect();
        let bins = histogram(&values);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 10);

        let flat = histogram(&[3.0, 3.0]);
        assert_eq!(flat, vec![Bin { start: 2.5, end: 3.5, count: 2 }]);
    }

    #[test]
    fn box_summary_flags_outliers() {
        let summary = BoxSummary::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.upper_whisker, 4.0);
        assert_eq!(summary.outliers, vec![100.0]);

        let even = BoxSummary::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!((even.q1, even.median, even.q3), (1.75, 2.5, 3.25));
        assert!(BoxSummary::from_values(&[]).is_none());
    }

    #[test]
    fn kde_is_positive_over_the_range() {
        let density = kde(&[1.0, 2.0, 2.5, 4.0], 20);
        assert_eq!(density.len(), 20);
        assert_eq!(density[0].0, 1.0);
        assert_eq!(density[19].0, 4.0);
        assert!(density.iter().all(|(_, d)| *d > 0.0));
    }
}
