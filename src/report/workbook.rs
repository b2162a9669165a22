//! Writes the two-sheet workbook with quality colouring and the embedded chart.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{
    ConditionalFormatCell, ConditionalFormatCellRule, Format, FormatBorder, Image, Workbook,
    Worksheet,
};
use tracing::{info, warn};

use crate::analysis::grade::{CRITICAL_MIN, GOOD_MAX, WARNING_MAX, WARNING_MIN};
use crate::analysis::types::Aggregates;
use crate::config::ChartConfig;
use crate::error::Result;
use crate::record::Period;
use crate::report::chart::render_chart;
use crate::report::table::{Cell, FAILURE_PCT_HEADER, SheetTable, daily_table, weekly_table};

pub const DAILY_SHEET: &str = "daily";
pub const WEEKLY_SHEET: &str = "weekly";

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub path: PathBuf,
    /// Non-fatal issues, e.g. formatting that had to be skipped.
    pub warnings: Vec<String>,
}

/// `Schraubreport_<variant>_KW<week>_<year>.xlsx`
pub fn report_file_name(variant: &str, period: Period) -> String {
    format!(
        "Schraubreport_{}_KW{}_{}.xlsx",
        variant, period.week, period.year
    )
}

/// Cell styles for the three quality bands.
struct QualityFormats {
    good: Format,
    warning: Format,
    critical: Format,
}

impl QualityFormats {
    fn new() -> Self {
        Self {
            good: Format::new()
                .set_background_color("#C6EFCE")
                .set_font_color("#006100"),
            warning: Format::new()
                .set_background_color("#FFEB9C")
                .set_font_color("#9C6500"),
            critical: Format::new()
                .set_background_color("#FFC7CE")
                .set_font_color("#9C0006"),
        }
    }
}

/// Renders `aggregates` into `dest_dir`, returning the written path.
#[tracing::instrument(skip_all, fields(dest = %dest_dir.display(), period = %aggregates.period))]
pub fn export(
    aggregates: &Aggregates,
    dest_dir: &Path,
    chart_config: &ChartConfig,
) -> Result<ExportOutcome> {
    let header = Format::new()
        .set_bold()
        .set_border_bottom(FormatBorder::Thin);
    let percent = Format::new().set_num_format("0.00");
    let quality = QualityFormats::new();
    let mut warnings = Vec::new();

    let daily = daily_table(&aggregates.daily_breakdown);
    let weekly = weekly_table(&aggregates.weekly_breakdown);

    let mut daily_sheet = Worksheet::new();
    daily_sheet.set_name(DAILY_SHEET)?;
    write_table(&mut daily_sheet, &daily, &header, &percent)?;
    if !apply_quality_formats(&mut daily_sheet, &daily, &quality)? {
        warnings.push(missing_column_warning(DAILY_SHEET));
    }

    let mut weekly_sheet = Worksheet::new();
    weekly_sheet.set_name(WEEKLY_SHEET)?;
    write_table(&mut weekly_sheet, &weekly, &header, &percent)?;
    if !apply_quality_formats(&mut weekly_sheet, &weekly, &quality)? {
        warnings.push(missing_column_warning(WEEKLY_SHEET));
    }
    insert_chart(&mut weekly_sheet, aggregates, weekly.rows.len(), chart_config)?;

    let mut workbook = Workbook::new();
    workbook.push_worksheet(daily_sheet);
    workbook.push_worksheet(weekly_sheet);

    let path = dest_dir.join(report_file_name(&aggregates.variant, aggregates.period));
    workbook.save(&path)?;

    info!(path = %path.display(), warnings = warnings.len(), "Report written");
    Ok(ExportOutcome { path, warnings })
}

fn write_table(
    sheet: &mut Worksheet,
    table: &SheetTable,
    header: &Format,
    percent: &Format,
) -> Result<()> {
    for (col, title) in table.headers.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, title, header)?;
        sheet.set_column_width(col, (title.chars().count() + 4).max(10) as f64)?;
    }

    for (row, cells) in table.rows.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => sheet.write_string(row, col, text)?,
                Cell::Count(count) => sheet.write_number(row, col, *count as f64)?,
                Cell::Percent(value) => sheet.write_number_with_format(row, col, *value, percent)?,
            };
        }
    }

    Ok(())
}

/// Colours the failure-percentage column by quality band.
///
/// Returns `false` when the table has no such column; the sheet is left
/// uncoloured and the export carries on.
fn apply_quality_formats(
    sheet: &mut Worksheet,
    table: &SheetTable,
    formats: &QualityFormats,
) -> Result<bool> {
    let Some(col) = table.column(FAILURE_PCT_HEADER) else {
        warn!(column = FAILURE_PCT_HEADER, "Column not found, skipping quality formatting");
        return Ok(false);
    };
    if table.rows.is_empty() {
        return Ok(true);
    }

    let col = col as u16;
    let (first, last) = (1, table.rows.len() as u32);

    let critical = ConditionalFormatCell::new()
        .set_rule(ConditionalFormatCellRule::GreaterThanOrEqualTo(CRITICAL_MIN))
        .set_format(&formats.critical);
    let warning = ConditionalFormatCell::new()
        .set_rule(ConditionalFormatCellRule::Between(WARNING_MIN, WARNING_MAX))
        .set_format(&formats.warning);
    let good = ConditionalFormatCell::new()
        .set_rule(ConditionalFormatCellRule::LessThanOrEqualTo(GOOD_MAX))
        .set_format(&formats.good);

    sheet.add_conditional_format(first, col, last, col, &critical)?;
    sheet.add_conditional_format(first, col, last, col, &warning)?;
    sheet.add_conditional_format(first, col, last, col, &good)?;

    Ok(true)
}

fn missing_column_warning(sheet: &str) -> String {
    format!(
        "column '{FAILURE_PCT_HEADER}' not found on sheet '{sheet}', quality colouring skipped"
    )
}

/// Writes a caption row and embeds the chart image below it.
fn insert_chart(
    sheet: &mut Worksheet,
    aggregates: &Aggregates,
    table_rows: usize,
    config: &ChartConfig,
) -> Result<()> {
    let title = chart_title(aggregates);
    let chart = render_chart(&aggregates.pivot, config, &title)?;

    // The caption needs one free row between the table and the image.
    let image_row = config.anchor_row.max(table_rows as u32 + 2);
    let col = config.anchor_col;

    let caption = format!(
        "{title} (y axis 0 to {:.2}, red line at {}, last group = weekly)",
        chart.y_max, config.threshold
    );
    sheet.write_string_with_format(image_row - 1, col, caption, &Format::new().set_bold())?;

    let image = Image::new_from_buffer(&chart.png)?
        .set_scale_width(config.scale)
        .set_scale_height(config.scale);
    sheet.insert_image_with_offset(image_row, col, &image, config.offset_px, config.offset_px)?;

    Ok(())
}

/// `Variant <v>, KW <w>/<y> (<first day> to <last day>): failure rate in % per robot`
fn chart_title(aggregates: &Aggregates) -> String {
    let days = aggregates.pivot.daily_rows();
    let span = match (days.first(), days.last()) {
        (Some(first), Some(last)) => format!(" ({} to {})", first.label, last.label),
        _ => String::new(),
    };
    format!(
        "Variant {}, KW {}/{}{span}: failure rate in % per robot",
        aggregates.variant, aggregates.period.week, aggregates.period.year
    )
}
