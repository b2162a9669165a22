//! Console rendering of aggregates.
//!
//! Supports a plain-text summary and JSON.

use std::io::Write;

use anyhow::Result;

use crate::analysis::grade::classify;
use crate::analysis::types::Aggregates;
use crate::analysis::utility::round2;

/// Writes the weekly per-robot figures followed by the daily pivot.
pub fn write_summary<W: Write>(out: &mut W, aggregates: &Aggregates) -> Result<()> {
    writeln!(out, "Variant {}, {}", aggregates.variant, aggregates.period)?;
    writeln!(out)?;
    writeln!(
        out,
        "{:<12} {:>8} {:>9} {:>10}  level",
        "robot", "events", "failures", "failure %"
    )?;
    for weekly in &aggregates.weekly {
        let pct = round2(weekly.failure_pct());
        let level = classify(pct).map(|l| l.label()).unwrap_or("-");
        writeln!(
            out,
            "{:<12} {:>8} {:>9} {:>10.2}  {}",
            weekly.robot_id.as_str(),
            weekly.counts.total,
            weekly.counts.failures,
            pct,
            level
        )?;
    }

    writeln!(out)?;
    write!(out, "{:<12}", "date")?;
    for robot in &aggregates.pivot.robots {
        write!(out, " {:>10}", robot.as_str())?;
    }
    writeln!(out)?;
    for row in &aggregates.pivot.rows {
        write!(out, "{:<12}", row.label.to_string())?;
        for value in &row.values {
            match value {
                Some(v) => write!(out, " {:>10.2}", round2(*v))?,
                None => write!(out, " {:>10}", "-")?,
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Writes all aggregates as pretty-printed JSON.
pub fn write_json<W: Write>(out: &mut W, aggregates: &Aggregates) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, aggregates)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::period::validate;
    use crate::record::{RawEvent, RobotId};
    use std::path::Path;
    use std::sync::Arc;

    fn aggregates() -> Aggregates {
        let source: Arc<Path> = Arc::from(Path::new("Rob_8_1/log.csv"));
        let rows = [
            ("03.06.2024", "Rob_8_1", 0),
            ("03.06.2024", "Rob_8_1", 1),
            ("04.06.2024", "Rob_8_2", 0),
        ];
        let raw = rows
            .into_iter()
            .map(|(date, robot, status)| RawEvent {
                source: Arc::clone(&source),
                line: 2,
                date: date.to_string(),
                time: "06:00".to_string(),
                program_number: "1".to_string(),
                status,
                robot_id: RobotId::new(robot),
                trace: None,
            })
            .collect();
        aggregate(&validate(raw).unwrap().with_variant("Hintertür"))
    }

    #[test]
    fn test_summary_lists_robots_and_gaps() {
        let mut out = Vec::new();
        write_summary(&mut out, &aggregates()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Variant Hintertür, KW23/2024"));
        assert_eq!(
            line_tokens(&text, "Rob_8_1"),
            ["Rob_8_1", "2", "1", "50.00", "critical"]
        );
        assert_eq!(
            line_tokens(&text, "Rob_8_2"),
            ["Rob_8_2", "1", "0", "0.00", "good"]
        );
        assert_eq!(line_tokens(&text, "03.06.2024"), ["03.06.2024", "50.00", "-"]);
        assert_eq!(line_tokens(&text, "Ø"), ["Ø", "week", "50.00", "0.00"]);
    }

    fn line_tokens<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
        text.lines()
            .find(|line| line.starts_with(prefix))
            .map(|line| line.split_whitespace().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_json_contains_every_view() {
        let mut out = Vec::new();
        write_json(&mut out, &aggregates()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["period"]["week"], 23);
        assert_eq!(value["weekly"][0]["robot_id"], "Rob_8_1");
        assert_eq!(value["weekly"][0]["failures"], 1);
        assert_eq!(value["weekly_breakdown"]["status_codes"], serde_json::json!([0, 1]));
        assert_eq!(value["weekly_breakdown"]["rows"][0]["failure_pct"], 50.0);
        assert_eq!(value["pivot"]["rows"][0]["values"], serde_json::json!([50.0, null]));
    }
}
