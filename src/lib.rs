//! Weekly screw-tightening quality reports.
//!
//! Per-robot tightening logs are ingested into one batch, checked to cover a
//! single ISO calendar week, aggregated into failure rates and written to an
//! xlsx workbook with quality colouring and an embedded chart.

pub mod analysis;
pub mod config;
pub mod discover;
pub mod error;
pub mod ingest;
pub mod output;
pub mod period;
pub mod record;
pub mod report;
pub mod session;

pub use error::{ReportError, Result};
