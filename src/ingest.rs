//! Ingestion of per-robot tightening logs into one [`RawEvent`] collection.
//!
//! Each file is read independently, tagged with the robot id found in its
//! path and appended in the order the paths were supplied. The first file
//! that cannot be read aborts the whole batch.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{ReportConfig, SchemaSetting};
use crate::error::{ReportError, Result};
use crate::period::parse_date;
use crate::record::{RawEvent, RobotId, SourceSchema, TighteningTrace};

/// Extracts robot ids from source paths.
#[derive(Debug, Clone)]
pub struct RobotMatcher {
    patterns: Vec<Regex>,
    known: HashSet<String>,
    unknown: RobotId,
}

impl RobotMatcher {
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        let patterns = config
            .robot_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ReportError::RobotPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            known: config.known_robots.iter().cloned().collect(),
            unknown: RobotId::new(config.unknown_label.clone()),
        })
    }

    /// Returns the matched text of the first path segment any pattern matches,
    /// or the unknown sentinel.
    pub fn robot_for(&self, path: &Path) -> RobotId {
        path_segments(path)
            .find_map(|segment| {
                self.patterns
                    .iter()
                    .find_map(|re| re.find(segment))
                    .map(|m| RobotId::new(m.as_str()))
            })
            .unwrap_or_else(|| self.unknown.clone())
    }

    pub fn is_known(&self, robot: &RobotId) -> bool {
        self.known.is_empty() || self.known.contains(robot.as_str())
    }
}

/// Finds the product variant in the first source path.
pub fn detect_variant(paths: &[PathBuf], keywords: &[String], unknown: &str) -> String {
    paths
        .first()
        .and_then(|path| {
            path_segments(path).find(|segment| keywords.iter().any(|k| k == segment))
        })
        .unwrap_or(unknown)
        .to_string()
}

fn path_segments(path: &Path) -> impl Iterator<Item = &str> {
    path.components().filter_map(|component| match component {
        Component::Normal(segment) => segment.to_str(),
        _ => None,
    })
}

/// Reads source files into a unified event collection.
#[derive(Debug, Clone)]
pub struct Normalizer {
    matcher: RobotMatcher,
    schema: SchemaSetting,
    delimiter: u8,
    max_files: usize,
}

impl Normalizer {
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        Ok(Self {
            matcher: RobotMatcher::from_config(config)?,
            schema: config.schema,
            delimiter: config.delimiter_byte(),
            max_files: config.max_files,
        })
    }

    /// Rejects empty and oversized selections without touching the filesystem.
    pub fn check_volume(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ReportError::NoInputSelected);
        }
        if count > self.max_files {
            return Err(ReportError::InputVolumeExceeded {
                count,
                limit: self.max_files,
            });
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(files = paths.len()))]
    pub fn ingest(&self, paths: &[PathBuf]) -> Result<Vec<RawEvent>> {
        self.check_volume(paths.len())?;

        let mut events = Vec::new();
        for path in paths {
            let file_events = self.read_source(path)?;
            debug!(path = %path.display(), rows = file_events.len(), "Source file read");
            events.extend(file_events);
        }

        info!(events = events.len(), "Ingestion complete");
        Ok(events)
    }

    fn read_source(&self, path: &Path) -> Result<Vec<RawEvent>> {
        let robot_id = self.matcher.robot_for(path);
        if !self.matcher.is_known(&robot_id) {
            warn!(path = %path.display(), robot = %robot_id, "Robot id not in known set");
        }

        let file = File::open(path).map_err(|e| ReportError::file_parse(path, e))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header_columns = reader
            .headers()
            .map_err(|e| ReportError::file_parse(path, e))?
            .len();
        let source: Arc<Path> = Arc::from(path);

        let mut schema = self.schema.fixed();
        let mut events = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| ReportError::file_parse(path, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row_schema = match schema {
                Some(fixed) => fixed,
                None => {
                    let detected = detect_schema(header_columns, &record).map_err(|reason| {
                        ReportError::file_parse(path, format!("line {line}: {reason}"))
                    })?;
                    debug!(path = %path.display(), schema = ?detected, "Column layout detected");
                    schema = Some(detected);
                    detected
                }
            };
            let event = parse_row(&record, row_schema, line, &source, &robot_id)
                .map_err(|reason| ReportError::file_parse(path, reason))?;
            events.push(event);
        }

        Ok(events)
    }
}

/// Picks the layout of a file from its first data row.
///
/// Narrow files are split. Wide files are extended only when the first field
/// carries a date and a time; a plain date in the first field means a split
/// file with extra columns. Anything else cannot be told apart.
fn detect_schema(
    header_columns: usize,
    first: &StringRecord,
) -> std::result::Result<SourceSchema, String> {
    if header_columns.max(first.len()) < SourceSchema::EXTENDED_COLUMNS {
        return Ok(SourceSchema::Split);
    }

    let leading = first.get(0).unwrap_or_default();
    match parse_date(leading) {
        Some((_, Some(_))) => Ok(SourceSchema::Extended),
        Some((_, None)) => Ok(SourceSchema::Split),
        None => Err(format!(
            "cannot tell the column layout: first field '{}' is neither a date nor a timestamp",
            leading.trim()
        )),
    }
}

fn parse_row(
    record: &StringRecord,
    schema: SourceSchema,
    line: u64,
    source: &Arc<Path>,
    robot_id: &RobotId,
) -> std::result::Result<RawEvent, String> {
    if record.len() < schema.min_columns() {
        return Err(format!(
            "line {line}: expected at least {} columns, found {}",
            schema.min_columns(),
            record.len()
        ));
    }

    let field = |i: usize| record.get(i).unwrap_or_default().trim().to_string();
    let parse_status = |raw: String| {
        raw.parse::<i64>()
            .map_err(|_| format!("line {line}: status '{raw}' is not an integer"))
    };

    let event = match schema {
        SourceSchema::Split => RawEvent {
            source: Arc::clone(source),
            line,
            date: field(0),
            time: field(1),
            program_number: field(2),
            status: parse_status(field(3))?,
            robot_id: robot_id.clone(),
            trace: None,
        },
        SourceSchema::Extended => RawEvent {
            source: Arc::clone(source),
            line,
            date: field(0),
            time: String::new(),
            program_number: field(1),
            status: parse_status(field(2))?,
            robot_id: robot_id.clone(),
            trace: Some(TighteningTrace {
                total_runtime: field(3),
                step_3: field(4),
                torque_3: field(5),
                angle_3: field(6),
                step_nok: field(7),
                torque_nok: field(8),
                angle_nok: field(9),
            }),
        },
    };

    Ok(event)
}
