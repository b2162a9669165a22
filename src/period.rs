//! Calendar-period gate: a batch is accepted only when every event falls in
//! one ISO (year, week).

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::error::{ReportError, Result};
use crate::record::{EventRecord, Period, RawEvent};

/// Combined date-time layouts found in extended sources. Two-digit years come
/// before four-digit ones: `%Y` also accepts a two-digit year and would read
/// `24` as year 24.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Date-only layouts, day first, two-digit years before four-digit ones.
const DATE_FORMATS: &[&str] = &[
    "%d.%m.%y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%Y-%m-%d",
];

/// Parses a date field, day first. Returns the time part when the field carries one.
pub fn parse_date(raw: &str) -> Option<(NaiveDate, Option<String>)> {
    let raw = raw.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| (dt.date(), Some(dt.time().format("%H:%M:%S").to_string())))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|date| (date, None))
        })
}

/// Events that passed the period gate, together with their single period.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    period: Period,
    variant: String,
    events: Vec<EventRecord>,
}

impl ValidatedBatch {
    pub fn period(&self) -> Period {
        self.period
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Set the product variant used to label the report.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }
}

/// Parses every event's date and checks that the batch spans exactly one ISO week.
///
/// # Errors
///
/// - [`ReportError::DateParse`] for the first unparseable date
/// - [`ReportError::EmptyBatch`] when there are no events
/// - [`ReportError::PeriodInconsistency`] when more than one (year, week) is present
#[tracing::instrument(skip_all, fields(events = raw.len()))]
pub fn validate(raw: Vec<RawEvent>) -> Result<ValidatedBatch> {
    let mut periods = BTreeSet::new();
    let mut events = Vec::with_capacity(raw.len());

    for event in raw {
        let (date, time) = parse_date(&event.date)
            .ok_or_else(|| date_error(&event.source, event.line, &event.date))?;
        periods.insert(Period::of(date));
        events.push(EventRecord {
            date,
            time: time.unwrap_or(event.time),
            program_number: event.program_number,
            status: event.status,
            robot_id: event.robot_id,
            trace: event.trace,
        });
    }

    let mut iter = periods.iter().copied();
    match (iter.next(), iter.next()) {
        (None, _) => Err(ReportError::EmptyBatch),
        (Some(period), None) => {
            info!(period = %period, events = events.len(), "Batch period validated");
            Ok(ValidatedBatch {
                period,
                variant: String::new(),
                events,
            })
        }
        (Some(_), Some(_)) => {
            let periods: Vec<Period> = periods.into_iter().collect();
            warn!(count = periods.len(), "Batch spans more than one calendar week");
            Err(ReportError::PeriodInconsistency { periods })
        }
    }
}

fn date_error(source: &Path, line: u64, value: &str) -> ReportError {
    ReportError::DateParse {
        path: source.to_path_buf(),
        line,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RobotId;
    use std::sync::Arc;

    fn raw(date: &str) -> RawEvent {
        RawEvent {
            source: Arc::from(Path::new("Rob_8_1/day.csv")),
            line: 2,
            date: date.to_string(),
            time: "06:00:00".to_string(),
            program_number: "1".to_string(),
            status: 0,
            robot_id: RobotId::new("Rob_8_1"),
            trace: None,
        }
    }

    #[test]
    fn test_parse_date_is_day_first() {
        let (date, time) = parse_date("03.06.2024").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert!(time.is_none());

        let (date, _) = parse_date("04/06/2024").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
    }

    #[test]
    fn test_parse_date_with_time() {
        let (date, time) = parse_date("2024-06-05 14:03:22").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
        assert_eq!(time.as_deref(), Some("14:03:22"));
    }

    #[test]
    fn test_parse_date_two_digit_year() {
        let june_3 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(parse_date("03.06.24").unwrap().0, june_3);
        assert_eq!(parse_date("03/06/24").unwrap().0, june_3);
        assert_eq!(parse_date("03-06-24").unwrap().0, june_3);
        assert_eq!(parse_date("03.06.2024").unwrap().0, june_3);
        assert_eq!(parse_date("2024-06-03").unwrap().0, june_3);

        let (date, time) = parse_date("03.06.24 06:15").unwrap();
        assert_eq!(date, june_3);
        assert_eq!(time.as_deref(), Some("06:15:00"));
    }

    #[test]
    fn test_two_digit_year_lands_in_the_right_week() {
        let batch = validate(vec![raw("03.06.24"), raw("09.06.2024")]).unwrap();
        assert_eq!(batch.period(), Period::new(2024, 23));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("31.02.2024").is_none());
    }

    #[test]
    fn test_single_week_is_accepted() {
        // 3 June to 9 June 2024 is ISO week 23.
        let batch = validate(vec![raw("03.06.2024"), raw("09.06.2024")]).unwrap();
        assert_eq!(batch.period(), Period::new(2024, 23));
        assert_eq!(batch.events().len(), 2);
        assert_eq!(batch.events()[0].time, "06:00:00");
    }

    #[test]
    fn test_one_record_from_another_week_rejects_batch() {
        let mut events: Vec<RawEvent> = (0..9).map(|_| raw("11.06.2024")).collect();
        events.push(raw("07.06.2024"));

        let err = validate(events).unwrap_err();

        match err {
            ReportError::PeriodInconsistency { periods } => {
                assert_eq!(periods, vec![Period::new(2024, 23), Period::new(2024, 24)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_week_number_in_different_years_is_rejected() {
        let err = validate(vec![raw("03.06.2024"), raw("05.06.2023")]).unwrap_err();
        assert!(matches!(err, ReportError::PeriodInconsistency { .. }));
    }

    #[test]
    fn test_unparseable_date_is_distinct_from_period_mismatch() {
        let err = validate(vec![raw("03.06.2024"), raw("n/a")]).unwrap_err();
        match err {
            ReportError::DateParse { value, line, .. } => {
                assert_eq!(value, "n/a");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(validate(Vec::new()), Err(ReportError::EmptyBatch)));
    }

    #[test]
    fn test_extended_timestamp_fills_time() {
        let mut event = raw("2024-06-04 07:15:00");
        event.time = String::new();
        let batch = validate(vec![event]).unwrap().with_variant("Hintertür");
        assert_eq!(batch.events()[0].time, "07:15:00");
        assert_eq!(batch.variant(), "Hintertür");
    }
}
