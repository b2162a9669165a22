//! Failure-rate aggregation over a validated batch.
//!
//! Computes per-day and per-week failure rates for each robot, pivots the
//! daily rates into a date x robot table, and breaks event counts down by
//! status code.

pub mod breakdown;
pub mod daily;
pub mod grade;
pub mod types;
pub mod utility;

use tracing::info;

use crate::period::ValidatedBatch;
use types::Aggregates;

/// Computes every aggregate view of `batch`.
#[tracing::instrument(skip_all, fields(period = %batch.period(), events = batch.events().len()))]
pub fn aggregate(batch: &ValidatedBatch) -> Aggregates {
    let events = batch.events();

    let daily = daily::daily_rates(events);
    let weekly = daily::weekly_rates(events);
    let pivot = daily::pivot(&daily, &weekly);
    let daily_breakdown = breakdown::daily_breakdown(events);
    let weekly_breakdown = breakdown::weekly_breakdown(events);

    info!(
        robots = weekly.len(),
        days = pivot.daily_rows().len(),
        status_codes = weekly_breakdown.status_codes.len(),
        "Aggregation complete"
    );

    Aggregates {
        period: batch.period(),
        variant: batch.variant().to_string(),
        daily,
        weekly,
        pivot,
        daily_breakdown,
        weekly_breakdown,
    }
}
