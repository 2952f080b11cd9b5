//! Latency-vs-rate comparison chart for two benchmark result files.
//!
//! Result files are CSV with a header row; only the `rate` and `latency_mean`
//! columns are read and they are plotted as-is, in file order.

use crate::output::write_atomic;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;
const COLORS: [&str; 2] = ["#1f77b4", "#ff7f0e"];

#[derive(Debug, Deserialize)]
struct ResultRow {
    rate: f64,
    latency_mean: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    /// `(rate, latency_mean)` pairs
    pub points: Vec<(f64, f64)>,
}

pub fn load_series(path: &Path, label: impl Into<String>) -> Result<Series> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open results {}", path.display()))?;
    let mut points = vec![];
    for (idx, row) in reader.deserialize::<ResultRow>().enumerate() {
        let row = row.with_context(|| format!("failed to parse results {}", path.display()))?;
        ensure!(
            row.rate.is_finite() && row.latency_mean.is_finite(),
            "{}: row {} has a non-finite value",
            path.display(),
            idx + 1
        );
        points.push((row.rate, row.latency_mean));
    }
    ensure!(!points.is_empty(), "{} has no result rows", path.display());
    debug!(path = %path.display(), rows = points.len(), "loaded results");
    Ok(Series { label: label.into(), points })
}

/// Label for a result file when none is given: its file stem, e.g. `LOCKFREE`.
pub fn default_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads both result files, then writes the chart. Nothing is written if either input fails.
pub fn compare(
    baseline: &Path,
    baseline_label: Option<String>,
    candidate: &Path,
    candidate_label: Option<String>,
    output: &Path,
) -> Result<()> {
    let a = load_series(
        baseline,
        baseline_label.unwrap_or_else(|| default_label(baseline)),
    )?;
    let b = load_series(
        candidate,
        candidate_label.unwrap_or_else(|| default_label(candidate)),
    )?;

    let svg = render_svg(&a, &b).context("failed to render chart")?;
    write_atomic(output, |w| w.write_all(svg.as_bytes()))?;
    info!(path = %output.display(), "wrote chart");
    Ok(())
}

struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if min == max {
            return Bounds { min: min - 1.0, max: max + 1.0 };
        }
        let pad = (max - min) * 0.05;
        Bounds { min: min - pad, max: max + pad }
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        let step = (self.max - self.min) / (TICKS - 1) as f64;
        (0..TICKS).map(move |i| self.min + step * i as f64)
    }
}

struct Frame {
    x: Bounds,
    y: Bounds,
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        let w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        MARGIN_LEFT + (x - self.x.min) / (self.x.max - self.x.min) * w
    }

    fn py(&self, y: f64) -> f64 {
        let h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        HEIGHT - MARGIN_BOTTOM - (y - self.y.min) / (self.y.max - self.y.min) * h
    }
}

fn fmt_tick(v: f64) -> String {
    if v.abs() >= 100.0 {
        format!("{v:.0}")
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_svg(a: &Series, b: &Series) -> Result<String, std::fmt::Error> {
    let all = || a.points.iter().chain(b.points.iter());
    let frame = Frame {
        x: Bounds::of(all().map(|p| p.0)),
        y: Bounds::of(all().map(|p| p.1)),
    };
    let (left, right) = (MARGIN_LEFT, WIDTH - MARGIN_RIGHT);
    let (top, bottom) = (MARGIN_TOP, HEIGHT - MARGIN_BOTTOM);

    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-size="16">Mean Latency Comparison: {} vs {}</text>"#,
        WIDTH / 2.0,
        escape(&a.label),
        escape(&b.label)
    )?;

    // grid and tick labels
    for x in frame.x.ticks() {
        let px = frame.px(x);
        writeln!(
            svg,
            r##"<line x1="{px:.1}" y1="{top}" x2="{px:.1}" y2="{bottom}" stroke="#dddddd"/>"##
        )?;
        writeln!(
            svg,
            r#"<text x="{px:.1}" y="{}" text-anchor="middle">{}</text>"#,
            bottom + 18.0,
            fmt_tick(x)
        )?;
    }
    for y in frame.y.ticks() {
        let py = frame.py(y);
        writeln!(
            svg,
            r##"<line x1="{left}" y1="{py:.1}" x2="{right}" y2="{py:.1}" stroke="#dddddd"/>"##
        )?;
        writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" text-anchor="end">{}</text>"#,
            left - 8.0,
            py + 4.0,
            fmt_tick(y)
        )?;
    }
    writeln!(
        svg,
        r#"<rect x="{left}" y="{top}" width="{}" height="{}" fill="none" stroke="black"/>"#,
        right - left,
        bottom - top
    )?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle">Request Rate (req/s)</text>"#,
        (left + right) / 2.0,
        HEIGHT - 15.0
    )?;
    writeln!(
        svg,
        r#"<text x="20" y="{0}" text-anchor="middle" transform="rotate(-90 20 {0})">Latency (ms)</text>"#,
        (top + bottom) / 2.0
    )?;

    for (idx, series) in [a, b].into_iter().enumerate() {
        let color = COLORS[idx];
        let path: Vec<String> = series
            .points
            .iter()
            .map(|&(x, y)| format!("{:.1},{:.1}", frame.px(x), frame.py(y)))
            .collect();
        writeln!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
            path.join(" ")
        )?;
        for &(x, y) in &series.points {
            marker(&mut svg, idx, frame.px(x), frame.py(y), color)?;
        }

        // legend
        let ly = top + 20.0 + idx as f64 * 20.0;
        writeln!(
            svg,
            r#"<line x1="{}" y1="{ly}" x2="{}" y2="{ly}" stroke="{color}" stroke-width="2"/>"#,
            left + 15.0,
            left + 45.0
        )?;
        marker(&mut svg, idx, left + 30.0, ly, color)?;
        writeln!(
            svg,
            r#"<text x="{}" y="{}">{} Mean Latency</text>"#,
            left + 55.0,
            ly + 4.0,
            escape(&series.label)
        )?;
    }
    writeln!(svg, "</svg>")?;
    Ok(svg)
}

/// Circles for the first series, crosses for the second.
fn marker(svg: &mut String, series: usize, x: f64, y: f64, color: &str) -> std::fmt::Result {
    if series == 0 {
        writeln!(svg, r#"<circle cx="{x:.1}" cy="{y:.1}" r="4" fill="{color}"/>"#)
    } else {
        let d = 4.0;
        writeln!(
            svg,
            r#"<path d="M{:.1},{:.1} L{:.1},{:.1} M{:.1},{:.1} L{:.1},{:.1}" stroke="{color}" stroke-width="2"/>"#,
            x - d,
            y - d,
            x + d,
            y + d,
            x - d,
            y + d,
            x + d,
            y - d
        )
    }
}
