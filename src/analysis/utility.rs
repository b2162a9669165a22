use serde::Serializer;

/// Percentage of `part` in `total`. Returns 0.0 for an empty total.
pub fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Rounds to two decimal places. Applied when a value is presented, never
/// to intermediate results.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Serializes a percentage rounded to two decimals.
pub(crate) fn serialize_pct<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}

pub(crate) fn serialize_opt_pct<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_some(&round2(*v)),
        None => serializer.serialize_none(),
    }
}
