//! Spreadsheet report: a daily and a weekly failure-breakdown sheet, quality
//! colouring on the failure-percentage column, and a static comparison chart
//! on the weekly sheet.

pub mod chart;
pub mod table;
pub mod workbook;

pub use workbook::{ExportOutcome, export, report_file_name};
