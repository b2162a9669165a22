//! Report configuration.
//!
//! Loaded from an optional TOML file; every field falls back to its default,
//! so an empty file (or none at all) yields [`ReportConfig::default`]:
//!
//! ```toml
//! max_files = 21
//! robot_patterns = ['^Rob_\d+_\d+']
//! known_robots = ["Rob_8_1", "Rob_8_2", "Rob_8_3"]
//! unknown_label = "unknown"
//! variant_keywords = ["Hintertür", "Vordertür"]
//! schema = "auto"
//!
//! [chart]
//! width_px = 3600
//! height_px = 1800
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{ReportError, Result};
use crate::record::SourceSchema;

/// How the column layout of each source file is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSetting {
    /// Decided per file from its first data row.
    #[default]
    Auto,
    Split,
    Extended,
}

impl SchemaSetting {
    /// The configured schema, or `None` when it has to be detected.
    pub fn fixed(self) -> Option<SourceSchema> {
        match self {
            SchemaSetting::Auto => None,
            SchemaSetting::Split => Some(SourceSchema::Split),
            SchemaSetting::Extended => Some(SourceSchema::Extended),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Upper bound on source files per batch (3 robots x 7 days).
    pub max_files: usize,
    /// Regexes tried against each path segment; the matched text becomes the robot id.
    pub robot_patterns: Vec<String>,
    /// Expected robot ids. Empty accepts any.
    pub known_robots: Vec<String>,
    /// Robot id and variant used when nothing in the path matches.
    pub unknown_label: String,
    pub variant_keywords: Vec<String>,
    pub schema: SchemaSetting,
    pub delimiter: char,
    pub chart: ChartConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_files: 21,
            robot_patterns: vec![r"^Rob_\d+_\d+".to_string()],
            known_robots: Vec::new(),
            unknown_label: "unknown".to_string(),
            variant_keywords: vec!["Hintertür".to_string(), "Vordertür".to_string()],
            schema: SchemaSetting::Auto,
            delimiter: ',',
            chart: ChartConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Loads the config from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub(crate) fn delimiter_byte(&self) -> u8 {
        u8::try_from(u32::from(self.delimiter)).unwrap_or(b',')
    }
}

/// Size and placement of the embedded comparison chart.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width_px: u32,
    pub height_px: u32,
    /// Zero-based cell the image is anchored at on the weekly sheet.
    pub anchor_row: u32,
    pub anchor_col: u16,
    pub scale: f64,
    pub offset_px: u32,
    /// Height of the horizontal reference line.
    pub threshold: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width_px: 3600,
            height_px: 1800,
            anchor_row: 6,
            anchor_col: 0,
            scale: 0.5,
            offset_px: 5,
            threshold: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = ReportConfig::from_toml("").unwrap();
        assert_eq!(config.max_files, 21);
        assert_eq!(config.unknown_label, "unknown");
        assert_eq!(config.schema, SchemaSetting::Auto);
        assert_eq!(config.chart.anchor_row, 6);
    }

    #[test]
    fn test_partial_override() {
        let config = ReportConfig::from_toml(
            r#"
            max_files = 6
            known_robots = ["Rob_8_1"]
            schema = "extended"
            delimiter = ";"

            [chart]
            scale = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.max_files, 6);
        assert_eq!(config.known_robots, vec!["Rob_8_1"]);
        assert_eq!(config.schema, SchemaSetting::Extended);
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.chart.scale, 0.25);
        assert_eq!(config.chart.width_px, 3600);
    }

    #[test]
    fn test_unknown_schema_is_rejected() {
        assert!(ReportConfig::from_toml("schema = \"wide\"").is_err());
    }

    #[test]
    fn test_only_auto_schema_needs_detection() {
        assert_eq!(SchemaSetting::Auto.fixed(), None);
        assert_eq!(SchemaSetting::Split.fixed(), Some(SourceSchema::Split));
        assert_eq!(SchemaSetting::Extended.fixed(), Some(SourceSchema::Extended));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = ReportConfig::load(Path::new("/nonexistent/screw_report.toml")).unwrap_err();
        assert!(matches!(err, ReportError::ConfigRead { .. }));
    }
}
