//! Error taxonomy for the report pipeline.
//!
//! Every stage returns [`Result`]. Batch-level variants (volume, parse,
//! period) mean the whole batch is discarded; nothing partial survives them.

use std::path::PathBuf;

use crate::record::Period;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// More source files than the configured ceiling. Raised before any file is opened.
    #[error("too many input files: {count} selected, at most {limit} allowed")]
    InputVolumeExceeded { count: usize, limit: usize },

    /// Aggregation requested with an empty file selection.
    #[error("no input files selected")]
    NoInputSelected,

    /// A source file could not be read or does not match the canonical column shape.
    #[error("failed to process '{}': {reason}", path.display())]
    FileParse { path: PathBuf, reason: String },

    /// A date field could not be parsed as a calendar date.
    #[error("unparseable date '{value}' in '{}' line {line}", path.display())]
    DateParse {
        path: PathBuf,
        line: u64,
        value: String,
    },

    /// Records span more than one ISO (year, week) pair.
    #[error("records do not belong to the same calendar week: found {}", format_periods(.periods))]
    PeriodInconsistency { periods: Vec<Period> },

    /// Source files contained a header row but no events.
    #[error("input files contain no events")]
    EmptyBatch,

    /// Export requested without a validated batch or without a destination.
    #[error("export not possible: {0}")]
    ExportPrecondition(String),

    /// Failed to read the configuration file.
    #[error("failed to read config file '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::config::ReportConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configured robot pattern is not a valid regular expression.
    #[error("invalid robot pattern '{pattern}': {source}")]
    RobotPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("failed to scan '{}': {source}", path.display())]
    Discover {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("spreadsheet error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub(crate) fn file_parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ReportError::FileParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

fn format_periods(periods: &[Period]) -> String {
    periods
        .iter()
        .map(Period::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
