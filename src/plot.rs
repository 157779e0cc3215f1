//! Chart rendering with the [`plotters`] bitmap backend.
//!
//! Two charts are produced: a scatter of green ratio against temperature with
//! the fitted regression line, and a bar chart of mean temperature per
//! green-ratio tercile. All fonts, sizes and labels come from a [`PlotStyle`]
//! passed in by the caller.

use plotters::coord::ranged1d::SegmentedCoord;
use plotters::coord::types::RangedCoordu32;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

use crate::analyzers::grouping::GroupMeans;
use crate::analyzers::regression::{Fit, Regression};
use crate::report::format_general;

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// Number of points sampled along the regression line.
const LINE_SAMPLES: usize = 100;

/// Fonts, figure sizes and texts for both charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    /// Font family name; must cover the glyphs used in the labels.
    pub font_family: String,
    pub dpi: u32,
    /// Width and height in inches.
    pub scatter_size_in: (f64, f64),
    pub bar_size_in: (f64, f64),
    pub scatter_title: String,
    pub x_label: String,
    pub y_label: String,
    pub bar_title: String,
    pub bar_x_label: String,
    pub group_labels: [String; 3],
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            dpi: 300,
            scatter_size_in: (6.0, 5.0),
            bar_size_in: (5.0, 4.0),
            scatter_title: "Green ratio vs average temperature".to_string(),
            x_label: "Green ratio (%)".to_string(),
            y_label: "Average temperature (°C)".to_string(),
            bar_title: "Average temperature by green ratio group".to_string(),
            bar_x_label: "Green ratio group".to_string(),
            group_labels: ["Low".to_string(), "Medium".to_string(), "High".to_string()],
        }
    }
}

impl PlotStyle {
    /// Pixel dimensions of a figure given in inches.
    pub fn pixels(&self, size_in: (f64, f64)) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (size_in.0 * dpi).round().max(1.0) as u32,
            (size_in.1 * dpi).round().max(1.0) as u32,
        )
    }

    /// Converts a size in points to pixels at the configured DPI.
    pub fn pt(&self, points: f64) -> f64 {
        (points * f64::from(self.dpi) / 72.0).max(1.0)
    }

    fn px(&self, points: f64) -> u32 {
        self.pt(points).round() as u32
    }
}

/// Value range covering `values` with 5% padding on each side.
pub fn padded_range(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    if min == max {
        return Some(min - 1.0..max + 1.0);
    }
    let pad = (max - min) * 0.05;
    Some(min - pad..max + pad)
}

/// Evenly spaced points on the fitted line between `x_min` and `x_max`.
pub fn fit_line(fit: &Fit, x_min: f64, x_max: f64) -> Vec<(f64, f64)> {
    let step = (x_max - x_min) / (LINE_SAMPLES - 1) as f64;
    (0..LINE_SAMPLES)
        .map(|i| {
            let x = x_min + step * i as f64;
            (x, fit.predict(x))
        })
        .collect()
}

/// Text lines placed in the bottom-right corner of the scatter plot.
pub fn annotation(fit: &Fit) -> [String; 3] {
    [
        format!("r={:.3}", fit.r),
        format!("R²={:.3}", fit.r_squared),
        format!("p={}", format_general(fit.r_p_value, 3)),
    ]
}

/// One segment per green group: Low, Medium, High.
pub fn group_axis() -> SegmentedCoord<RangedCoordu32> {
    (0u32..2u32).into_segmented()
}

/// Tick label for a segment of [`group_axis`]; the trailing edge is unlabeled.
pub fn group_label(labels: &[String; 3], value: &SegmentValue<u32>) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            labels.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

/// Draws the green ratio / temperature scatter and saves it as a PNG.
///
/// The regression line and its statistics are only drawn when `regression`
/// holds a computed fit.
pub fn scatter_with_fit(
    points: &[(f64, f64)],
    regression: &Regression,
    style: &PlotStyle,
    output_path: &Path,
) -> Result<()> {
    let x_range = padded_range(points.iter().map(|p| p.0))
        .ok_or_else(|| PlotError::InvalidData("no finite points to plot".to_string()))?;
    let y_range = padded_range(points.iter().map(|p| p.1))
        .ok_or_else(|| PlotError::InvalidData("no finite points to plot".to_string()))?;

    let root = BitMapBackend::new(output_path, style.pixels(style.scatter_size_in))
        .into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let font = style.font_family.as_str();

    let mut chart = ChartBuilder::on(&root)
        .caption(&style.scatter_title, (font, style.pt(12.0)))
        .margin(style.px(8.0))
        .x_label_area_size(style.px(30.0))
        .y_label_area_size(style.px(40.0))
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc(style.x_label.as_str())
        .y_desc(style.y_label.as_str())
        .label_style((font, style.pt(8.0)))
        .axis_desc_style((font, style.pt(10.0)))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    let radius = style.px(3.0);
    chart
        .draw_series(
            points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&p| Circle::new(p, radius, BLUE.filled())),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    if let Some(fit) = regression.fit() {
        let (x_min, x_max) = points
            .iter()
            .map(|p| p.0)
            .filter(|x| x.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x), hi.max(x))
            });

        chart
            .draw_series(LineSeries::new(
                fit_line(fit, x_min, x_max),
                RED.stroke_width(style.px(1.5)),
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        let area = chart.plotting_area().strip_coord_spec();
        let (width, height) = area.dim_in_pixel();
        let inset = style.px(6.0) as i32;
        let padding = style.px(3.0) as i32;
        let line_height = style.px(12.0) as i32;
        let text_style = TextStyle::from((font, style.pt(9.0)).into_font())
            .pos(Pos::new(HPos::Right, VPos::Bottom));

        let lines = annotation(fit);
        let mut text_width = 0;
        for line in &lines {
            let (w, _) = area
                .estimate_text_size(line, &text_style)
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
            text_width = text_width.max(w as i32);
        }

        // backing box, drawn over the points and the fitted line
        let right = width as i32 - inset;
        let bottom = height as i32 - inset;
        let text_height = lines.len() as i32 * line_height;
        let corners = [
            (right - text_width - 2 * padding, bottom - text_height - 2 * padding),
            (right, bottom),
        ];
        area.draw(&Rectangle::new(corners, WHITE.mix(0.9).filled()))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
        area.draw(&Rectangle::new(corners, BLACK.mix(0.4).stroke_width(1)))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        for (i, line) in lines.iter().rev().enumerate() {
            let anchor = (right - padding, bottom - padding - i as i32 * line_height);
            area.draw(&Text::new(line.as_str(), anchor, text_style.clone()))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
        }
    }

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

/// Draws the per-group mean temperature bar chart and saves it as a PNG.
///
/// Bars follow the fixed Low, Medium, High order; empty groups leave a gap.
pub fn group_bar_chart(means: &GroupMeans, style: &PlotStyle, output_path: &Path) -> Result<()> {
    let bars: Vec<(u32, f64)> = means
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.mean_temp.map(|t| (i as u32, t)))
        .collect();
    if bars.is_empty() {
        return Err(PlotError::InvalidData(
            "no group has a mean temperature".to_string(),
        ));
    }

    let top = bars.iter().map(|b| b.1).fold(0.0, f64::max);
    let bottom = bars.iter().map(|b| b.1).fold(0.0, f64::min);
    let pad = (top - bottom).max(1.0) * 0.1;
    let y_range = if bottom < 0.0 { bottom - pad } else { 0.0 }..top + pad;

    let root = BitMapBackend::new(output_path, style.pixels(style.bar_size_in))
        .into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let font = style.font_family.as_str();

    let mut chart = ChartBuilder::on(&root)
        .caption(&style.bar_title, (font, style.pt(12.0)))
        .margin(style.px(8.0))
        .x_label_area_size(style.px(30.0))
        .y_label_area_size(style.px(40.0))
        .build_cartesian_2d(group_axis(), y_range)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    let label_for = |v: &SegmentValue<u32>| group_label(&style.group_labels, v);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(3)
        .x_label_formatter(&label_for)
        .x_desc(style.bar_x_label.as_str())
        .y_desc(style.y_label.as_str())
        .label_style((font, style.pt(8.0)))
        .axis_desc_style((font, style.pt(10.0)))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.8).filled())
                .margin(style.px(10.0))
                .data(bars.iter().copied()),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit() -> Fit {
        Fit {
            n: 5,
            r: -1.0,
            r_p_value: 1.234e-5,
            slope: -0.1,
            intercept: 16.0,
            r_squared: 1.0,
            slope_p_value: 1.234e-5,
            stderr: 0.0,
        }
    }

    #[test]
    fn test_default_figure_sizes() {
        let style = PlotStyle::default();
        assert_eq!(style.pixels(style.scatter_size_in), (1800, 1500));
        assert_eq!(style.pixels(style.bar_size_in), (1500, 1200));
        assert_eq!(style.pt(72.0), 300.0);
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([10.0, 30.0].into_iter()), Some(9.0..31.0));
        assert_eq!(padded_range([5.0, f64::NAN].into_iter()), Some(4.0..6.0));
        assert_eq!(padded_range(std::iter::empty()), None);
    }

    #[test]
    fn test_fit_line_spans_x_range() {
        let line = fit_line(&fit(), 10.0, 50.0);

        assert_eq!(line.len(), LINE_SAMPLES);
        assert_eq!(line[0], (10.0, 15.0));
        let (x_last, y_last) = line[LINE_SAMPLES - 1];
        assert!((x_last - 50.0).abs() < 1e-9);
        assert!((y_last - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_annotation() {
        assert_eq!(
            annotation(&fit()),
            [
                "r=-1.000".to_string(),
                "R²=1.000".to_string(),
                "p=1.23e-05".to_string()
            ]
        );
    }

    #[test]
    fn test_group_axis_has_one_segment_per_group() {
        let axis = group_axis();
        let labels = PlotStyle::default().group_labels;

        // three groups plus the trailing edge
        assert_eq!(axis.size(), 4);
        let ticks: Vec<String> = (0..axis.size())
            .filter_map(|i| axis.from_index(i))
            .map(|v| group_label(&labels, &v))
            .collect();
        assert_eq!(ticks, vec!["Low", "Medium", "High", ""]);
        assert!(matches!(axis.from_index(3), Some(SegmentValue::Last)));
    }

    #[test]
    fn test_render_scatter_with_and_without_fit() {
        use crate::analyzers::regression::linregress;

        let x = [10.0, 20.0, 30.0, 40.0, 50.0];
        let y = [15.0, 14.0, 13.0, 12.0, 11.0];
        let points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        let style = PlotStyle {
            dpi: 72,
            ..PlotStyle::default()
        };

        let fitted = std::env::temp_dir().join("green_temp_test_scatter_fit.png");
        let regression = linregress(&x, &y).unwrap();
        assert!(regression.fit().is_some());
        scatter_with_fit(&points, &regression, &style, &fitted).unwrap();
        assert!(fitted.exists());

        let bare = std::env::temp_dir().join("green_temp_test_scatter_bare.png");
        let regression = linregress(&x[..2], &y[..2]).unwrap();
        assert_eq!(regression, Regression::Insufficient { n: 2 });
        scatter_with_fit(&points[..2], &regression, &style, &bare).unwrap();
        assert!(bare.exists());

        std::fs::remove_file(&fitted).unwrap();
        std::fs::remove_file(&bare).unwrap();
    }

    #[test]
    fn test_render_three_bar_chart() {
        use crate::analyzers::grouping::{group_means, tercile_groups};

        let ratios = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        let temps = [15.0, 14.5, 13.0, 12.5, 11.0, 10.5];
        let means = group_means(&tercile_groups(&ratios).unwrap(), &temps);
        let style = PlotStyle {
            dpi: 72,
            ..PlotStyle::default()
        };
        let path = std::env::temp_dir().join("green_temp_test_bars.png");

        group_bar_chart(&means, &style, &path).unwrap();
        assert!(path.exists());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bar_chart_rejects_all_empty_groups() {
        use crate::analyzers::grouping::group_means;

        let means = group_means(&[None, None], &[1.0, 2.0]);
        let path = std::env::temp_dir().join("green_temp_test_empty_bars.png");

        let err = group_bar_chart(&means, &PlotStyle::default(), &path).unwrap_err();
        assert!(matches!(err, PlotError::InvalidData(_)));
        assert!(!path.exists());
    }
}
