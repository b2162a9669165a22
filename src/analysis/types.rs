//! Data types produced by the aggregation engine.
//!
//! Percentages are kept unrounded; [`round2`](super::utility::round2) is
//! applied when they are serialized or rendered.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::utility::{pct, round2, serialize_opt_pct, serialize_pct};
use crate::record::{Period, RobotId};

/// Event and failure totals for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub total: u64,
    pub failures: u64,
}

impl FailureCounts {
    pub(crate) fn record(&mut self, failure: bool) {
        self.total += 1;
        if failure {
            self.failures += 1;
        }
    }

    pub fn failure_pct(&self) -> f64 {
        pct(self.failures, self.total)
    }
}

/// Failure rate of one robot on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub robot_id: RobotId,
    #[serde(flatten)]
    pub counts: FailureCounts,
}

impl DailyAggregate {
    pub fn failure_pct(&self) -> f64 {
        self.counts.failure_pct()
    }
}

/// Failure rate of one robot over the whole week, weighted by event count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    pub robot_id: RobotId,
    #[serde(flatten)]
    pub counts: FailureCounts,
}

impl WeeklyAggregate {
    pub fn failure_pct(&self) -> f64 {
        self.counts.failure_pct()
    }
}

/// Row label of the pivoted failure-rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotLabel {
    Day(NaiveDate),
    Week,
}

impl fmt::Display for PivotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotLabel::Day(date) => write!(f, "{}", date.format("%d.%m.%Y")),
            PivotLabel::Week => f.write_str("Ø week"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub label: PivotLabel,
    /// One cell per robot in [`DailyPivot::robots`] order. `None` means the
    /// robot had no events that day, which is not the same as 0 %.
    #[serde(serialize_with = "serialize_cells")]
    pub values: Vec<Option<f64>>,
}

fn serialize_cells<S: serde::Serializer>(
    values: &[Option<f64>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    #[derive(Serialize)]
    struct Cell(#[serde(serialize_with = "serialize_opt_pct")] Option<f64>);

    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(&Cell(*value))?;
    }
    seq.end()
}

/// Daily failure rate per robot: one row per date, one column per robot,
/// with the weekly row appended last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPivot {
    pub robots: Vec<RobotId>,
    pub rows: Vec<PivotRow>,
}

impl DailyPivot {
    /// Daily rows only, without the weekly summary.
    pub fn daily_rows(&self) -> &[PivotRow] {
        match self.rows.last() {
            Some(row) if row.label == PivotLabel::Week => &self.rows[..self.rows.len() - 1],
            _ => &self.rows,
        }
    }

    pub fn weekly_row(&self) -> Option<&PivotRow> {
        self.rows.last().filter(|row| row.label == PivotLabel::Week)
    }

    /// Largest value in the table, 0.0 when empty.
    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(|row| row.values.iter().flatten())
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Grouping key of the daily failure breakdown.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DailyKey {
    pub date: NaiveDate,
    pub robot_id: RobotId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow<K> {
    pub key: K,
    /// Event count per status code, aligned with [`FailureBreakdown::status_codes`].
    pub counts: Vec<u64>,
    pub total: u64,
    #[serde(serialize_with = "serialize_pct")]
    pub failure_pct: f64,
}

impl<K> BreakdownRow<K> {
    /// Events with a nonzero status.
    pub fn failures(&self, status_codes: &[i64]) -> u64 {
        status_codes
            .iter()
            .zip(&self.counts)
            .filter(|(code, _)| **code != 0)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn failure_pct_rounded(&self) -> f64 {
        round2(self.failure_pct)
    }
}

/// Event counts per status code, one column per code observed in the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureBreakdown<K> {
    /// Distinct status codes in ascending order; `0` counts successes.
    pub status_codes: Vec<i64>,
    pub rows: Vec<BreakdownRow<K>>,
}

/// Every view computed from one validated batch.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregates {
    pub period: Period,
    pub variant: String,
    pub daily: Vec<DailyAggregate>,
    pub weekly: Vec<WeeklyAggregate>,
    pub pivot: DailyPivot,
    pub daily_breakdown: FailureBreakdown<DailyKey>,
    pub weekly_breakdown: FailureBreakdown<RobotId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_counts() {
        let mut counts = FailureCounts::default();
        counts.record(false);
        counts.record(true);
        counts.record(false);
        counts.record(false);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.failures, 1);
        assert_eq!(counts.failure_pct(), 25.0);
    }

    #[test]
    fn test_breakdown_row_failures_skip_success_column() {
        let row = BreakdownRow {
            key: RobotId::new("Rob_8_1"),
            counts: vec![8, 1, 1],
            total: 10,
            failure_pct: 20.0,
        };
        assert_eq!(row.failures(&[0, 1, 2]), 2);
    }

    #[test]
    fn test_pivot_splits_weekly_row() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let pivot = DailyPivot {
            robots: vec![RobotId::new("Rob_8_1")],
            rows: vec![
                PivotRow {
                    label: PivotLabel::Day(day),
                    values: vec![Some(12.5)],
                },
                PivotRow {
                    label: PivotLabel::Week,
                    values: vec![Some(10.0)],
                },
            ],
        };
        assert_eq!(pivot.daily_rows().len(), 1);
        assert_eq!(pivot.weekly_row().unwrap().values, vec![Some(10.0)]);
        assert_eq!(pivot.max_value(), 12.5);
    }

    #[test]
    fn test_pivot_serializes_rounded_cells_and_gaps() {
        let pivot = DailyPivot {
            robots: vec![RobotId::new("Rob_8_1"), RobotId::new("Rob_8_2")],
            rows: vec![PivotRow {
                label: PivotLabel::Week,
                values: vec![Some(100.0 / 3.0), None],
            }],
        };
        let json = serde_json::to_value(&pivot).unwrap();
        assert_eq!(json["rows"][0]["values"], serde_json::json!([33.33, null]));
        assert_eq!(json["rows"][0]["label"], "week");
    }
}
