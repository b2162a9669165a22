use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::types::{BreakdownRow, DailyKey, FailureBreakdown};
use crate::analysis::utility::pct;
use crate::record::{EventRecord, RobotId};

/// Status-code counts per (date, robot).
pub fn daily_breakdown(events: &[EventRecord]) -> FailureBreakdown<DailyKey> {
    breakdown_by(events, |event| DailyKey {
        date: event.date,
        robot_id: event.robot_id.clone(),
    })
}

/// Status-code counts per robot over the whole batch.
pub fn weekly_breakdown(events: &[EventRecord]) -> FailureBreakdown<RobotId> {
    breakdown_by(events, |event| event.robot_id.clone())
}

/// Groups events by `key` and status, then unstacks the status dimension
/// into one column per code seen anywhere in `events`.
fn breakdown_by<K, F>(events: &[EventRecord], key: F) -> FailureBreakdown<K>
where
    K: Ord,
    F: Fn(&EventRecord) -> K,
{
    let status_codes: Vec<i64> = events
        .iter()
        .map(|e| e.status)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut groups: BTreeMap<K, BTreeMap<i64, u64>> = BTreeMap::new();
    for event in events {
        *groups
            .entry(key(event))
            .or_default()
            .entry(event.status)
            .or_default() += 1;
    }

    let rows = groups
        .into_iter()
        .map(|(key, by_status)| {
            let counts: Vec<u64> = status_codes
                .iter()
                .map(|code| by_status.get(code).copied().unwrap_or(0))
                .collect();
            let total = counts.iter().sum();
            let failures = by_status
                .iter()
                .filter(|(code, _)| **code != 0)
                .map(|(_, count)| count)
                .sum();

            BreakdownRow {
                key,
                counts,
                total,
                failure_pct: pct(failures, total),
            }
        })
        .collect();

    FailureBreakdown { status_codes, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(day: u32, robot: &str, status: i64) -> EventRecord {
        EventRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            time: "06:00:00".to_string(),
            program_number: "1".to_string(),
            status,
            robot_id: RobotId::new(robot),
            trace: None,
        }
    }

    #[test]
    fn test_weekly_breakdown_columns_and_totals() {
        let events: Vec<EventRecord> = [0, 0, 0, 1, 0, 0, 2, 0, 0, 0]
            .into_iter()
            .map(|status| event(3, "Rob_8_1", status))
            .collect();

        let breakdown = weekly_breakdown(&events);

        assert_eq!(breakdown.status_codes, vec![0, 1, 2]);
        let row = &breakdown.rows[0];
        assert_eq!(row.key.as_str(), "Rob_8_1");
        assert_eq!(row.counts, vec![8, 1, 1]);
        assert_eq!(row.total, 10);
        assert_eq!(row.failure_pct_rounded(), 20.0);
    }

    #[test]
    fn test_status_columns_are_shared_across_rows() {
        let events = vec![
            event(3, "Rob_8_1", 0),
            event(3, "Rob_8_2", 5),
            event(4, "Rob_8_1", -1),
        ];

        let breakdown = daily_breakdown(&events);

        assert_eq!(breakdown.status_codes, vec![-1, 0, 5]);
        assert_eq!(breakdown.rows.len(), 3);
        assert_eq!(breakdown.rows[0].counts, vec![0, 1, 0]);
        assert_eq!(breakdown.rows[0].failure_pct, 0.0);
        assert_eq!(breakdown.rows[1].key.robot_id.as_str(), "Rob_8_2");
        assert_eq!(breakdown.rows[1].counts, vec![0, 0, 1]);
        assert_eq!(breakdown.rows[1].failure_pct, 100.0);
        assert_eq!(breakdown.rows[2].counts, vec![1, 0, 0]);
    }

    #[test]
    fn test_batch_without_successes_has_no_zero_column() {
        let events = vec![event(3, "Rob_8_1", 4), event(3, "Rob_8_1", 4)];

        let breakdown = weekly_breakdown(&events);

        assert_eq!(breakdown.status_codes, vec![4]);
        assert_eq!(breakdown.rows[0].failure_pct, 100.0);
    }

    #[test]
    fn test_daily_totals_sum_to_weekly_totals() {
        let events = vec![
            event(3, "Rob_8_1", 0),
            event(3, "Rob_8_1", 1),
            event(4, "Rob_8_1", 0),
            event(5, "Rob_8_2", 2),
            event(6, "Rob_8_2", 0),
        ];

        let daily = daily_breakdown(&events);
        let weekly = weekly_breakdown(&events);

        for row in &weekly.rows {
            let summed: u64 = daily
                .rows
                .iter()
                .filter(|d| d.key.robot_id == row.key)
                .map(|d| d.total)
                .sum();
            assert_eq!(summed, row.total);
            assert_eq!(
                row.failures(&weekly.status_codes),
                daily
                    .rows
                    .iter()
                    .filter(|d| d.key.robot_id == row.key)
                    .map(|d| d.failures(&daily.status_codes))
                    .sum::<u64>()
            );
        }
    }
}
