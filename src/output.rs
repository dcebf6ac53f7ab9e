use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use serde::Serialize;

use crate::config::FigureConfig;
use crate::pdf::{text_extent, PdfBackend};
use crate::synth::{nan_max, search_sorted, ClosureSet, EnergyCurves};

/// 6.4 x 4.8 in at 250 px/in.
pub const FIGURE_SIZE_PX: (u32, u32) = (1600, 1200);
pub const FIGURE_DPI: f64 = 250.0;

/// 10 pt at the figure resolution.
const FONT_PX: f64 = 35.0;
const SERIES_WIDTH_PX: u32 = 5;
const MARKER_WIDTH_PX: u32 = 3;
const LEGEND_SWATCH_PX: i32 = 50;

pub const X_LABEL: &str = "(t - t0)/M";
pub const Y_LABEL: &str = "E(x(t)) (arb. units)";
pub const MARKER_TEXT: &str = "t*";

// C0, C1, C2 of the matplotlib default cycle.
const SERIES_COLORS: [RGBColor; 3] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
];
const MARKER_COLOR: RGBColor = RGBColor(40, 40, 40);

/// Placement of the t* reference marker and its text label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerLabel {
    /// x position of the dashed marker line
    pub line_x: f64,
    /// Axis index the label height was read from
    pub index: usize,
    /// E_(0) at `index`
    pub reference: f64,
    pub text_x: f64,
    pub text_y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurvePeak {
    pub closure: ClosureSet,
    pub label: String,
    pub max: f64,
    pub t_at_max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FigureSummary {
    pub output_path: PathBuf,
    pub samples: usize,
    pub t_star_abs: f64,
    pub marker: MarkerLabel,
    pub peaks: Vec<CurvePeak>,
}

/// Sizes, in pixels, of the chart margin and the two label areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelAreas {
    pub margin: u32,
    pub x_area: u32,
    pub y_area: u32,
}

/// Place the marker label just right of t*, at 90% of E_(0) there.
///
/// Falls back to 5% of the E_(0) maximum when the curve has decayed to zero at
/// the marker, so the label never sits on the axis.
pub fn marker_label(curves: &EnergyCurves, cfg: &FigureConfig) -> MarkerLabel {
    let line_x = cfg.t_star_abs();
    let index = search_sorted(&curves.t, line_x).min(curves.len().saturating_sub(1));
    let reference = curves.e_0.get(index).copied().unwrap_or(0.0);
    let text_y = if reference > 0.0 {
        reference * 0.9
    } else {
        0.05 * nan_max(&curves.e_0)
    };

    MarkerLabel {
        line_x,
        index,
        reference,
        text_x: line_x + cfg.label_offset,
        text_y,
    }
}

pub fn curve_peaks(curves: &EnergyCurves) -> Vec<CurvePeak> {
    ClosureSet::ALL
        .iter()
        .map(|&set| {
            let (i_max, max) = curves
                .curve(set)
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
                    if v > best.1 {
                        (i, v)
                    } else {
                        best
                    }
                });
            CurvePeak {
                closure: set,
                label: set.legend_label(),
                max,
                t_at_max: curves.t.get(i_max).copied().unwrap_or(f64::NAN),
            }
        })
        .collect()
}

/// Data range of the y axis: all curves plus a 5% margin either side.
pub fn y_axis_range(curves: &EnergyCurves) -> (f64, f64) {
    let (lo, hi) = curves.value_range();
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= 0.0 {
        return (lo - 0.5, hi + 0.5);
    }
    (lo - 0.05 * span, hi + 0.05 * span)
}

/// Split `[lo, hi]` into dash intervals of length `dash` separated by `gap`.
pub fn dash_segments(lo: f64, hi: f64, dash: f64, gap: f64) -> Vec<(f64, f64)> {
    if hi <= lo {
        return Vec::new();
    }
    if dash <= 0.0 {
        return vec![(lo, hi)];
    }

    let mut segments = Vec::new();
    let mut start = lo;
    while start < hi {
        let end = (start + dash).min(hi);
        segments.push((start, end));
        start = end + gap.max(0.0);
    }
    segments
}

/// Size the label areas from the text they have to hold, so tick labels and
/// axis descriptions are never clipped.
pub fn tight_layout(y_tick_labels: &[String], size: f64) -> LabelAreas {
    let pad = 0.4 * size;
    let (_, line_height) = text_extent("0", size);
    let widest_tick = y_tick_labels
        .iter()
        .map(|label| text_extent(label, size).0)
        .fold(0.0_f64, f64::max);

    LabelAreas {
        margin: (0.6 * size).ceil() as u32,
        x_area: (2.0 * line_height + 3.0 * pad).ceil() as u32,
        y_area: (widest_tick + line_height + 3.0 * pad).ceil() as u32,
    }
}

fn font() -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, FONT_PX, FontStyle::Normal)
}

/// Render the three curves, the t* marker and the legend into a PDF at `path`.
pub fn plot_closure_energy(
    curves: &EnergyCurves,
    cfg: &FigureConfig,
    path: &Path,
) -> anyhow::Result<MarkerLabel> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = PdfBackend::new(path, FIGURE_SIZE_PX, FIGURE_DPI)?.into_drawing_area();
    root.fill(&WHITE)?;

    let x_min = curves.t.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = curves.t.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = y_axis_range(curves);

    let y_format = |v: &f64| format!("{v:.2}");
    let areas = tight_layout(&[y_format(&y_min), y_format(&y_max)], FONT_PX);
    tracing::debug!(?areas, x_min, x_max, y_min, y_max, "figure layout");

    let mut chart = ChartBuilder::on(&root)
        .margin(areas.margin)
        .x_label_area_size(areas.x_area)
        .y_label_area_size(areas.y_area)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(7)
        .y_labels(8)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&y_format)
        .label_style(font().color(&BLACK))
        .axis_desc_style(font().color(&BLACK))
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .draw()?;

    for (set, color) in ClosureSet::ALL.into_iter().zip(SERIES_COLORS) {
        chart
            .draw_series(LineSeries::new(
                curves
                    .t
                    .iter()
                    .copied()
                    .zip(curves.curve(set).iter().copied()),
                color.stroke_width(SERIES_WIDTH_PX),
            ))?
            .label(set.legend_label())
            .legend(move |(x, y)| {
                PathElement::new(
                    vec![(x, y), (x + LEGEND_SWATCH_PX, y)],
                    color.stroke_width(SERIES_WIDTH_PX),
                )
            });
    }

    let marker = marker_label(curves, cfg);
    let span = y_max - y_min;
    let marker_style = MARKER_COLOR.stroke_width(MARKER_WIDTH_PX);
    chart.draw_series(
        dash_segments(y_min, y_max, 0.0125 * span, 0.0055 * span)
            .into_iter()
            .map(|(a, b)| {
                PathElement::new(vec![(marker.line_x, a), (marker.line_x, b)], marker_style)
            }),
    )?;

    let text_style = font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    chart.draw_series(std::iter::once(Text::new(
        MARKER_TEXT,
        (marker.text_x, marker.text_y),
        text_style,
    )))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(font().color(&BLACK))
        .legend_area_size(LEGEND_SWATCH_PX + 10)
        .border_style(BLACK.mix(0.3))
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::synthesize;

    #[test]
    fn test_marker_label_reads_e0_at_marker() {
        let cfg = FigureConfig::default();
        let curves = synthesize(&cfg);
        let marker = marker_label(&curves, &cfg);

        assert_eq!(marker.line_x, 8.0);
        assert_eq!(marker.index, 320);
        assert!(curves.t[319] < 8.0 && curves.t[320] >= 8.0);
        assert_eq!(marker.reference, curves.e_0[320]);
        assert_eq!(marker.text_y, 0.9 * curves.e_0[320]);
        assert!((marker.text_x - 8.3).abs() < 1e-12);
    }

    #[test]
    fn test_marker_label_falls_back_when_decayed() {
        let cfg = FigureConfig::default();
        let mut curves = synthesize(&cfg);
        curves.e_0 = vec![0.0; curves.len()];
        curves.e_0[0] = 0.4;

        let marker = marker_label(&curves, &cfg);
        assert_eq!(marker.reference, 0.0);
        assert!((marker.text_y - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_marker_label_clamps_past_axis_end() {
        let cfg = FigureConfig {
            t_star: 100.0,
            ..Default::default()
        };
        let curves = synthesize(&cfg);
        let marker = marker_label(&curves, &cfg);
        assert_eq!(marker.index, curves.len() - 1);
        assert!(marker.text_y > 0.0);
    }

    #[test]
    fn test_y_range_has_margin() {
        let curves = synthesize(&FigureConfig::default());
        let (lo, hi) = curves.value_range();
        let (y_min, y_max) = y_axis_range(&curves);
        assert!(y_min < lo && y_max > hi);
    }

    #[test]
    fn test_dash_segments_cover_range() {
        let segments = dash_segments(0.0, 1.0, 0.3, 0.1);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], (0.0, 0.3));
        assert_eq!(segments[2].1, 1.0);
        assert!(segments.iter().all(|&(a, b)| b > a && b <= 1.0));
        assert!(dash_segments(1.0, 1.0, 0.1, 0.1).is_empty());
        assert_eq!(dash_segments(0.0, 2.0, 0.0, 0.1), vec![(0.0, 2.0)]);
    }

    #[test]
    fn test_tight_layout_grows_with_labels() {
        let short = tight_layout(&["0.1".to_string()], 35.0);
        let long = tight_layout(&["0.10000".to_string()], 35.0);
        assert!(long.y_area > short.y_area);
        assert_eq!(long.x_area, short.x_area);
    }

    #[test]
    fn test_curve_peaks() {
        let curves = synthesize(&FigureConfig::default());
        let peaks = curve_peaks(&curves);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].max, 0.5);
        assert_eq!(peaks[0].t_at_max, 0.0);
        assert!(peaks[2].max > peaks[0].max);
    }

    #[test]
    fn test_plot_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("figure.pdf");
        let cfg = FigureConfig::default();
        let curves = synthesize(&cfg);

        let marker = plot_closure_energy(&curves, &cfg, &path).unwrap();
        assert_eq!(marker, marker_label(&curves, &cfg));

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
