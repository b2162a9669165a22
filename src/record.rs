//! Canonical event model shared by every pipeline stage.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Robot identifier taken from a source file's path. Categorical, compared as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RobotId(String);

impl RobotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ISO-8601 (year, week) reporting period of a validated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Period {
    pub year: i32,
    pub week: u32,
}

impl Period {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self::new(iso.year(), iso.week())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KW{}/{}", self.week, self.year)
    }
}

/// Column layout of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSchema {
    /// `date, time, program_number, status`, extra columns ignored.
    Split,
    /// `timestamp, program_number, status` followed by seven tightening-trace columns.
    Extended,
}

impl SourceSchema {
    pub const SPLIT_COLUMNS: usize = 4;
    pub const EXTENDED_COLUMNS: usize = 10;

    pub fn min_columns(self) -> usize {
        match self {
            SourceSchema::Split => Self::SPLIT_COLUMNS,
            SourceSchema::Extended => Self::EXTENDED_COLUMNS,
        }
    }
}

/// Tightening-curve values present in extended sources. Carried through unmodified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TighteningTrace {
    pub total_runtime: String,
    pub step_3: String,
    pub torque_3: String,
    pub angle_3: String,
    pub step_nok: String,
    pub torque_nok: String,
    pub angle_nok: String,
}

/// One ingested row before its date has been validated.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub source: Arc<Path>,
    /// 1-based line number in the source file, header included.
    pub line: u64,
    /// Date (split sources) or combined date and time (extended sources), as read.
    pub date: String,
    /// Empty for extended sources.
    pub time: String,
    pub program_number: String,
    pub status: i64,
    pub robot_id: RobotId,
    pub trace: Option<TighteningTrace>,
}

/// One screw-tightening attempt with a parsed calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub date: NaiveDate,
    pub time: String,
    pub program_number: String,
    pub status: i64,
    pub robot_id: RobotId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TighteningTrace>,
}

impl EventRecord {
    pub fn is_failure(&self) -> bool {
        self.status != 0
    }
}
