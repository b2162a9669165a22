//! Grouped bar chart of daily failure rates, rendered to PNG in memory.
//!
//! One bar group per pivot row (each day, then the weekly row) and one bar
//! per robot. A vertical divider separates the weekly group and a horizontal
//! line marks the quality threshold. Text is drawn with an embedded font, so
//! rendering does not depend on fonts installed on the host.

use std::io::Cursor;
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::debug;

use crate::analysis::types::DailyPivot;
use crate::config::ChartConfig;
use crate::error::{ReportError, Result};

/// Series colours, one per robot column, cycled when there are more robots.
pub const PALETTE: [u32; 10] = [
    0x1F77B4, 0xFF7F0E, 0x2CA02C, 0xD62728, 0x9467BD, 0x8C564B, 0xE377C2, 0x7F7F7F, 0xBCBD22,
    0x17BECF,
];

const THRESHOLD_COLOR: RGBColor = RGBColor(0xE0, 0x00, 0x00);
const DIVIDER_COLOR: RGBColor = RGBColor(0x80, 0x80, 0x80);
const AXIS_COLOR: RGBColor = RGBColor(0x30, 0x30, 0x30);

/// Fraction of a group's width taken up by its bars.
const GROUP_FILL: f64 = 0.8;

const FONT: FontFamily<'static> = FontFamily::SansSerif;
static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

pub fn series_rgb(index: usize) -> u32 {
    PALETTE[index % PALETTE.len()]
}

fn series_color(index: usize) -> RGBColor {
    let rgb = series_rgb(index);
    RGBColor((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

fn ensure_font() -> Result<()> {
    let registered = *FONT_REGISTERED
        .get_or_init(|| register_font(FONT.as_str(), FontStyle::Normal, FONT_BYTES).is_ok());
    if registered {
        Ok(())
    } else {
        Err(ReportError::Chart("embedded font could not be loaded".into()))
    }
}

/// Encoded chart plus the y-axis range it was drawn with.
#[derive(Debug)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub y_max: f64,
}

/// Upper bound of the y axis: the largest value or the threshold, with headroom.
pub fn y_axis_max(pivot: &DailyPivot, threshold: f64) -> f64 {
    let top = pivot.max_value().max(threshold);
    if top <= 0.0 { 1.0 } else { top * 1.15 }
}

#[tracing::instrument(skip_all, fields(groups = pivot.rows.len(), robots = pivot.robots.len()))]
pub fn render_chart(pivot: &DailyPivot, config: &ChartConfig, title: &str) -> Result<ChartImage> {
    ensure_font()?;

    let width = config.width_px.max(64);
    let height = config.height_px.max(64);
    let y_max = y_axis_max(pivot, config.threshold);

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    draw(&mut buffer, (width, height), pivot, config.threshold, y_max, title)
        .map_err(|e| ReportError::Chart(e.to_string()))?;

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| ReportError::Chart("pixel buffer does not match chart size".into()))?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| ReportError::Chart(e.to_string()))?;

    let png = png.into_inner();
    debug!(bytes = png.len(), width, height, "Chart encoded");
    Ok(ChartImage { png, y_max })
}

fn draw(
    buffer: &mut [u8],
    size: (u32, u32),
    pivot: &DailyPivot,
    threshold: f64,
    y_max: f64,
    title: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    root.fill(&WHITE)?;

    let groups = pivot.rows.len().max(1) as f64;
    let stroke = (size.1 / 400).max(1);
    let font = f64::from(size.1) / 40.0;
    let swatch = (font / 2.0) as i32;

    let mut chart = ChartBuilder::on(&root)
        .margin(size.1 / 25)
        .caption(title, (FONT, font * 1.3))
        .x_label_area_size(font * 2.0)
        .y_label_area_size(font * 4.5)
        .build_cartesian_2d(0f64..groups, 0f64..y_max)?;

    let y_label = |v: &f64| format!("{v:.2}");
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .y_labels(8)
        .y_label_formatter(&y_label)
        .y_desc("Failure rate [%]")
        .label_style((FONT, font))
        .axis_desc_style((FONT, font))
        .axis_style(AXIS_COLOR.stroke_width(stroke))
        .draw()?;

    let bar_width = GROUP_FILL / pivot.robots.len().max(1) as f64;
    for (series, robot) in pivot.robots.iter().enumerate() {
        let color = series_color(series);
        let bars = pivot.rows.iter().enumerate().filter_map(|(group, row)| {
            row.values.get(series).copied().flatten().map(|v| {
                let x0 = group as f64 + (1.0 - GROUP_FILL) / 2.0 + series as f64 * bar_width;
                Rectangle::new([(x0, 0.0), (x0 + bar_width, v)], color.filled())
            })
        });
        chart
            .draw_series(bars)?
            .label(robot.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - swatch), (x + 2 * swatch, y + swatch)], color.filled())
            });
    }

    // Divider before the weekly group.
    if pivot.weekly_row().is_some() && pivot.rows.len() > 1 {
        let x = groups - 1.0;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, 0.0), (x, y_max)],
            DIVIDER_COLOR.stroke_width(stroke),
        )))?;
    }

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, threshold), (groups, threshold)],
            THRESHOLD_COLOR.stroke_width(stroke * 2),
        )))?
        .label(format!("threshold {threshold}"))
        .legend(move |(x, y)| {
            PathElement::new(
                vec![(x, y), (x + 2 * swatch, y)],
                THRESHOLD_COLOR.stroke_width(stroke * 2),
            )
        });

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font((FONT, font))
        .background_style(&WHITE.mix(0.85))
        .border_style(&AXIS_COLOR)
        .draw()?;

    // One label under each bar group.
    let label_style = TextStyle::from((FONT, font)).pos(Pos::new(HPos::Center, VPos::Top));
    for (group, row) in pivot.rows.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(group as f64 + 0.5, 0.0));
        root.draw(&Text::new(
            row.label.to_string(),
            (x, y + swatch),
            label_style.clone(),
        ))?;
    }

    root.present()?;
    Ok(())
}
