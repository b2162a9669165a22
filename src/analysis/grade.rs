//! Quality gates for failure percentages.
//!
//! The thresholds are compared against the percentage as presented
//! (0–100 scale, two decimals):
//!
//! | Range           | Level    |
//! |-----------------|----------|
//! | <= 0.2          | Good     |
//! | 0.2001 – 0.4999 | Warning  |
//! | >= 0.5          | Critical |
//!
//! Values strictly between the bands (e.g. 0.20005) match none of them,
//! exactly as the spreadsheet rules behave.

use serde::Serialize;

pub const GOOD_MAX: f64 = 0.2;
pub const WARNING_MIN: f64 = 0.2001;
pub const WARNING_MAX: f64 = 0.4999;
pub const CRITICAL_MIN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Good,
    Warning,
    Critical,
}

impl QualityLevel {
    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Good => "good",
            QualityLevel::Warning => "warning",
            QualityLevel::Critical => "critical",
        }
    }
}

/// Maps a presented failure percentage onto its quality band.
pub fn classify(pct: f64) -> Option<QualityLevel> {
    match pct {
        p if p >= CRITICAL_MIN => Some(QualityLevel::Critical),
        p if (WARNING_MIN..=WARNING_MAX).contains(&p) => Some(QualityLevel::Warning),
        p if p <= GOOD_MAX => Some(QualityLevel::Good),
        _ => None,
    }
}
