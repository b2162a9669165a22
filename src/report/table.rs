//! Sheet-shaped views of the failure breakdowns.

use crate::analysis::types::{BreakdownRow, DailyKey, FailureBreakdown};
use crate::record::RobotId;

pub const DATE_HEADER: &str = "Date";
pub const ROBOT_HEADER: &str = "Robot";
pub const TOTAL_HEADER: &str = "Total";
pub const FAILURE_PCT_HEADER: &str = "Failure %";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Count(u64),
    Percent(f64),
}

/// A header row plus data rows, written verbatim to one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    /// Index of the column titled `header`.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// One row per (date, robot): key columns, one count per status code, total, failure %.
pub fn daily_table(breakdown: &FailureBreakdown<DailyKey>) -> SheetTable {
    build_table(
        &[DATE_HEADER, ROBOT_HEADER],
        breakdown,
        |key: &DailyKey| {
            vec![
                Cell::Text(key.date.format("%d.%m.%Y").to_string()),
                Cell::Text(key.robot_id.to_string()),
            ]
        },
    )
}

/// One row per robot, same column shape as the daily table.
pub fn weekly_table(breakdown: &FailureBreakdown<RobotId>) -> SheetTable {
    build_table(&[ROBOT_HEADER], breakdown, |key: &RobotId| {
        vec![Cell::Text(key.to_string())]
    })
}

fn build_table<K>(
    key_headers: &[&str],
    breakdown: &FailureBreakdown<K>,
    key_cells: impl Fn(&K) -> Vec<Cell>,
) -> SheetTable {
    let headers = key_headers
        .iter()
        .map(|h| h.to_string())
        .chain(breakdown.status_codes.iter().map(i64::to_string))
        .chain([TOTAL_HEADER.to_string(), FAILURE_PCT_HEADER.to_string()])
        .collect();

    let rows = breakdown
        .rows
        .iter()
        .map(|row: &BreakdownRow<K>| {
            let mut cells = key_cells(&row.key);
            cells.extend(row.counts.iter().map(|count| Cell::Count(*count)));
            cells.push(Cell::Count(row.total));
            cells.push(Cell::Percent(row.failure_pct_rounded()));
            cells
        })
        .collect();

    SheetTable { headers, rows }
}
