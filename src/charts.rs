// Distribution charts
//
// The same `ChartSeries` values feed the SVG files written by the analysis
// run, the JSON consumed by the web page and the terminal bar charts.

use crate::aggregate::{percentage, Aggregator};
use crate::catalog::Column;
use anyhow::{Context, Result};
use palette::{Hsl, IntoColor, Srgb};
use plotters::prelude::*;
use serde::Serialize;
use std::f64::consts::PI;
use std::path::Path;
use tracing::info;

/// Bars shown in the mnemonic chart
pub const TOP_MNEMONICS: usize = 10;

const BAR_COLOR: [u8; 3] = [70, 130, 180];
const CONFIDENTIAL_COLOR: [u8; 3] = [220, 20, 60];
const PUBLIC_COLOR: [u8; 3] = [34, 139, 34];
const LOWERCASE_PUBLIC_COLOR: [u8; 3] = [255, 215, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: usize,
    /// Share of all catalog rows, full precision
    pub percentage: f64,
    pub rgb: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn total(&self) -> usize {
        self.points.iter().map(|p| p.value).sum()
    }
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<[u8; 3]> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            [rgb.red, rgb.green, rgb.blue]
        })
        .collect()
}

fn points_for(agg: &Aggregator<'_>, column: Column, limit: Option<usize>) -> Vec<(String, usize)> {
    agg.value_counts(column)
        .into_iter()
        .filter_map(|c| c.value.map(|v| (v, c.count)))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Top 10 mnemonics by row count
pub fn mnemonic_chart(agg: &Aggregator<'_>) -> ChartSeries {
    let total = agg.total_rows();
    ChartSeries {
        title: format!("Top {} Most Common Mnemonics", TOP_MNEMONICS),
        kind: ChartKind::Bar,
        x_label: "Mnemonic".to_string(),
        y_label: "Count".to_string(),
        points: points_for(agg, Column::Mnemonic, Some(TOP_MNEMONICS))
            .into_iter()
            .map(|(label, value)| ChartPoint {
                label,
                value,
                percentage: percentage(value, total),
                rgb: BAR_COLOR,
            })
            .collect(),
    }
}

pub fn item_type_chart(agg: &Aggregator<'_>) -> ChartSeries {
    let total = agg.total_rows();
    let counts = points_for(agg, Column::ItemType, None);
    let colors = generate_palette(counts.len());

    ChartSeries {
        title: "Distribution of Item Types".to_string(),
        kind: ChartKind::Pie,
        x_label: "Item Type".to_string(),
        y_label: "Count".to_string(),
        points: counts
            .into_iter()
            .zip(colors)
            .map(|((label, value), rgb)| ChartPoint {
                label,
                value,
                percentage: percentage(value, total),
                rgb,
            })
            .collect(),
    }
}

/// Pie of confidentiality codes: Y red, N green, lowercase n yellow, any
/// other code from the generated palette.
pub fn confidentiality_chart(agg: &Aggregator<'_>) -> ChartSeries {
    let total = agg.total_rows();
    let counts = points_for(agg, Column::Confidentiality, None);
    let fallback = generate_palette(counts.len());

    ChartSeries {
        title: "Distribution of Confidentiality".to_string(),
        kind: ChartKind::Pie,
        x_label: "Confidentiality".to_string(),
        y_label: "Count".to_string(),
        points: counts
            .into_iter()
            .enumerate()
            .map(|(i, (label, value))| {
                let rgb = match label.as_str() {
                    "Y" => CONFIDENTIAL_COLOR,
                    "N" => PUBLIC_COLOR,
                    "n" => LOWERCASE_PUBLIC_COLOR,
                    _ => fallback[i],
                };
                ChartPoint {
                    label,
                    value,
                    percentage: percentage(value, total),
                    rgb,
                }
            })
            .collect(),
    }
}

// ============================================================================
// SVG RENDERING
// ============================================================================

fn color(rgb: [u8; 3]) -> RGBColor {
    RGBColor(rgb[0], rgb[1], rgb[2])
}

/// Write `series` as an SVG image at `path`.
pub fn render_chart(series: &ChartSeries, path: &Path) -> Result<()> {
    let drawn = match series.kind {
        ChartKind::Bar => render_bar_chart(series, path),
        ChartKind::Pie => render_pie_chart(series, path),
    };
    drawn.with_context(|| format!("Failed to write chart {}", path.display()))?;

    info!(path = %path.display(), "Saved chart");
    Ok(())
}

fn render_bar_chart(series: &ChartSeries, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let slots = series.points.len().max(1) as u32;
    let max = series.points.iter().map(|p| p.value).max().unwrap_or(0) as u32;
    let top = (max + max / 10).max(1);
    let labels: Vec<&str> = series.points.iter().map(|p| p.label.as_str()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(&series.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..slots).into_segmented(), 0u32..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(series.x_label.as_str())
        .y_desc(series.y_label.as_str())
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i as usize).map(|s| s.to_string()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    chart.draw_series(series.points.iter().enumerate().map(|(i, point)| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0),
                (SegmentValue::Exact(i + 1), point.value as u32),
            ],
            color(point.rgb).filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn render_pie_chart(series: &ChartSeries, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(&series.title, ("sans-serif", 28))?;

    let (width, height) = area.dim_in_pixel();
    let center = ((width as f64 * 0.35), (height as f64 / 2.0));
    let radius = (height.min(width) as f64 * 0.4).max(1.0);
    let total = series.total();

    if total == 0 {
        area.draw(&Text::new(
            "No data",
            (center.0 as i32 - 30, center.1 as i32),
            ("sans-serif", 20),
        ))?;
        root.present()?;
        return Ok(());
    }

    // start at twelve o'clock, clockwise
    let mut start = -PI / 2.0;
    for point in &series.points {
        let sweep = point.value as f64 / total as f64 * 2.0 * PI;
        let steps = ((sweep.to_degrees()).ceil() as usize).max(2);

        let mut outline = vec![(center.0 as i32, center.1 as i32)];
        for step in 0..=steps {
            let angle = start + sweep * step as f64 / steps as f64;
            outline.push((
                (center.0 + radius * angle.cos()) as i32,
                (center.1 + radius * angle.sin()) as i32,
            ));
        }
        area.draw(&Polygon::new(outline, color(point.rgb).filled()))?;

        // share label, like autopct="%1.1f%%"
        let mid = start + sweep / 2.0;
        let share = point.value as f64 / total as f64 * 100.0;
        area.draw(&Text::new(
            format!("{:.1}%", share),
            (
                (center.0 + radius * 0.65 * mid.cos()) as i32 - 18,
                (center.1 + radius * 0.65 * mid.sin()) as i32 - 8,
            ),
            ("sans-serif", 16),
        ))?;

        start += sweep;
    }

    // legend
    let legend_x = (width as f64 * 0.72) as i32;
    for (i, point) in series.points.iter().enumerate() {
        let y = 40 + i as i32 * 28;
        area.draw(&Rectangle::new(
            [(legend_x, y), (legend_x + 18, y + 18)],
            color(point.rgb).filled(),
        ))?;
        area.draw(&Text::new(
            format!("{} ({})", point.label, point.value),
            (legend_x + 26, y + 2),
            ("sans-serif", 16),
        ))?;
    }

    root.present()?;
    Ok(())
}
