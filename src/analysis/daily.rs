use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::analysis::types::{
    DailyAggregate, DailyPivot, FailureCounts, PivotLabel, PivotRow, WeeklyAggregate,
};
use crate::record::{EventRecord, RobotId};

/// Failure rate per (date, robot), ordered by date then robot.
pub fn daily_rates(events: &[EventRecord]) -> Vec<DailyAggregate> {
    let mut groups: BTreeMap<(NaiveDate, &RobotId), FailureCounts> = BTreeMap::new();

    for event in events {
        groups
            .entry((event.date, &event.robot_id))
            .or_default()
            .record(event.is_failure());
    }

    groups
        .into_iter()
        .map(|((date, robot_id), counts)| DailyAggregate {
            date,
            robot_id: robot_id.clone(),
            counts,
        })
        .collect()
}

/// Failure rate per robot over the whole batch.
///
/// Derived from raw counts, so busy days weigh more than quiet ones. This is
/// not the mean of the daily rates.
pub fn weekly_rates(events: &[EventRecord]) -> Vec<WeeklyAggregate> {
    let mut groups: BTreeMap<&RobotId, FailureCounts> = BTreeMap::new();

    for event in events {
        groups
            .entry(&event.robot_id)
            .or_default()
            .record(event.is_failure());
    }

    groups
        .into_iter()
        .map(|(robot_id, counts)| WeeklyAggregate {
            robot_id: robot_id.clone(),
            counts,
        })
        .collect()
}

/// Pivots daily rates into date rows and robot columns, then appends the weekly row.
///
/// Only robots with at least one event become columns. A (date, robot) pair
/// without events stays `None`.
pub fn pivot(daily: &[DailyAggregate], weekly: &[WeeklyAggregate]) -> DailyPivot {
    let robots: Vec<RobotId> = daily
        .iter()
        .map(|d| &d.robot_id)
        .chain(weekly.iter().map(|w| &w.robot_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect();
    let column = |robot: &RobotId| robots.binary_search(robot).ok();

    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for aggregate in daily {
        let cells = by_date
            .entry(aggregate.date)
            .or_insert_with(|| vec![None; robots.len()]);
        if let Some(col) = column(&aggregate.robot_id) {
            cells[col] = Some(aggregate.failure_pct());
        }
    }

    let mut rows: Vec<PivotRow> = by_date
        .into_iter()
        .map(|(date, values)| PivotRow {
            label: PivotLabel::Day(date),
            values,
        })
        .collect();

    let mut week = vec![None; robots.len()];
    for aggregate in weekly {
        if let Some(col) = column(&aggregate.robot_id) {
            week[col] = Some(aggregate.failure_pct());
        }
    }
    rows.push(PivotRow {
        label: PivotLabel::Week,
        values: week,
    });

    DailyPivot { robots, rows }
}
