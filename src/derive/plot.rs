//! Histogram plot rendering: one PDF page per numeric column.

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon,
    Rgb,
};

use super::DeriveError;
use crate::table::stats::quantile;
use crate::table::Table;

// A4 portrait page and plot frame, in millimetres.
const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const MARGIN: f64 = 25.0;
const PLOT_BOTTOM: f64 = 40.0;
const PLOT_TOP: f64 = 250.0;

/// Fixed-width histogram over a column's non-null values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Histogram {
    pub bin_width: f64,
    /// (bin lower bound, count), ascending.
    pub bins: Vec<(f64, usize)>,
}

/// Bin values with the Freedman-Diaconis rule, clamped to 5..=50 bins.
/// Falls back to sqrt binning when the IQR collapses; a single distinct
/// value gets one full-count bin; no values yield no bins.
pub(crate) fn histogram(values: &[f64]) -> Histogram {
    if values.is_empty() {
        return Histogram {
            bin_width: 0.0,
            bins: Vec::new(),
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    if (max - min).abs() < f64::EPSILON {
        return Histogram {
            bin_width: 1.0,
            bins: vec![(min, sorted.len())],
        };
    }

    let n = sorted.len() as f64;
    let q1 = quantile(&sorted, 0.25).unwrap_or(min);
    let q3 = quantile(&sorted, 0.75).unwrap_or(max);
    let iqr = q3 - q1;
    let h = if iqr > 0.0 {
        2.0 * iqr / n.cbrt()
    } else {
        (max - min) / n.sqrt()
    };

    let num_bins = (((max - min) / h).ceil() as usize).clamp(5, 50);
    let bin_width = (max - min) / num_bins as f64;

    let mut counts = vec![0usize; num_bins];
    for &value in &sorted {
        let idx = ((value - min) / bin_width).floor() as usize;
        // The maximum value falls on the upper edge of the last bin.
        counts[idx.min(num_bins - 1)] += 1;
    }

    Histogram {
        bin_width,
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| (min + i as f64 * bin_width, count))
            .collect(),
    }
}

/// Render the plot document: one page per numeric column, in column order,
/// titled by column name, containing a histogram of that column's non-null
/// values. Non-numeric columns are skipped. A table with no numeric
/// columns yields a document with a single blank page and no content (the
/// PDF format requires at least one page).
pub fn render_plot(table: &Table) -> Result<Vec<u8>, DeriveError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("histograms", Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "page");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| DeriveError::Plot(e.to_string()))?;

    for (index, (name, values)) in table.numeric_columns().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "page");
            doc.get_page(page).get_layer(layer)
        };
        let xs: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        draw_histogram_page(&layer, &font, name, &histogram(&xs));
    }

    doc.save_to_bytes()
        .map_err(|e| DeriveError::Plot(e.to_string()))
}

fn draw_histogram_page(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    title: &str,
    hist: &Histogram,
) {
    layer.use_text(title, 16.0, Mm(MARGIN as f32), Mm((PAGE_HEIGHT - 20.0) as f32), font);

    layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    layer.set_outline_thickness(0.5);
    layer.add_line(axis_line(MARGIN, PLOT_BOTTOM, PAGE_WIDTH - MARGIN, PLOT_BOTTOM));
    layer.add_line(axis_line(MARGIN, PLOT_BOTTOM, MARGIN, PLOT_TOP));

    let max_count = hist.bins.iter().map(|(_, count)| *count).max().unwrap_or(0);
    if max_count == 0 {
        return;
    }

    let plot_width = PAGE_WIDTH - 2.0 * MARGIN;
    let bar_width = plot_width / hist.bins.len() as f64;
    layer.set_fill_color(Color::Rgb(Rgb::new(0.35, 0.45, 0.85, None)));
    for (i, (_, count)) in hist.bins.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let x0 = MARGIN + i as f64 * bar_width;
        let x1 = x0 + bar_width;
        let y1 = PLOT_BOTTOM + (PLOT_TOP - PLOT_BOTTOM) * (*count as f64 / max_count as f64);
        layer.add_polygon(Polygon {
            rings: vec![vec![
                (Point::new(Mm(x0 as f32), Mm(PLOT_BOTTOM as f32)), false),
                (Point::new(Mm(x1 as f32), Mm(PLOT_BOTTOM as f32)), false),
                (Point::new(Mm(x1 as f32), Mm(y1 as f32)), false),
                (Point::new(Mm(x0 as f32), Mm(y1 as f32)), false),
            ]],
            mode: PaintMode::FillStroke,
            winding_order: WindingOrder::NonZero,
        });
    }

    // Range labels at the axis ends, max count at the top of the y axis.
    let lo = hist.bins.first().map(|(bound, _)| *bound).unwrap_or(0.0);
    let hi = hist
        .bins
        .last()
        .map(|(bound, _)| bound + hist.bin_width)
        .unwrap_or(0.0);
    layer.use_text(format_tick(lo), 9.0, Mm(MARGIN as f32), Mm((PLOT_BOTTOM - 6.0) as f32), font);
    layer.use_text(
        format_tick(hi),
        9.0,
        Mm((PAGE_WIDTH - MARGIN - 12.0) as f32),
        Mm((PLOT_BOTTOM - 6.0) as f32),
        font,
    );
    layer.use_text(
        max_count.to_string(),
        9.0,
        Mm((MARGIN - 14.0) as f32),
        Mm(PLOT_TOP as f32),
        font,
    );
}

fn axis_line(x0: f64, y0: f64, x1: f64, y1: f64) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(x0 as f32), Mm(y0 as f32)), false),
            (Point::new(Mm(x1 as f32), Mm(y1 as f32)), false),
        ],
        is_closed: false,
    }
}

fn format_tick(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
