//! Front-end state for one operator session.
//!
//! Holds the current file selection, the destination directory and the last
//! successfully validated batch. A rebuild replaces the batch wholesale; a
//! failed rebuild clears it, so a stale batch can never be exported.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::analysis::{aggregate, types::Aggregates};
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::ingest::{Normalizer, detect_variant};
use crate::period::{ValidatedBatch, validate};
use crate::report::{ExportOutcome, export};

#[derive(Debug)]
pub struct Session {
    config: ReportConfig,
    normalizer: Normalizer,
    files: Vec<PathBuf>,
    destination: Option<PathBuf>,
    batch: Option<ValidatedBatch>,
}

impl Session {
    pub fn new(config: ReportConfig) -> Result<Self> {
        Ok(Self {
            normalizer: Normalizer::from_config(&config)?,
            config,
            files: Vec::new(),
            destination: None,
            batch: None,
        })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Replaces the file selection. An oversized selection is rejected and
    /// the previous selection kept.
    pub fn select_files(&mut self, files: Vec<PathBuf>) -> Result<usize> {
        if files.len() > self.config.max_files {
            return Err(ReportError::InputVolumeExceeded {
                count: files.len(),
                limit: self.config.max_files,
            });
        }
        self.files = files;
        Ok(self.files.len())
    }

    pub fn selected_files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn set_destination(&mut self, dir: impl Into<PathBuf>) {
        self.destination = Some(dir.into());
    }

    /// Ingests and validates the selected files.
    ///
    /// Any failure leaves the session without a batch.
    pub fn build(&mut self) -> Result<&ValidatedBatch> {
        self.batch = None;

        let batch = match self.build_batch() {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Batch rejected, dataset cleared");
                return Err(e);
            }
        };

        info!(
            variant = batch.variant(),
            period = %batch.period(),
            events = batch.events().len(),
            "Batch ready"
        );
        Ok(&*self.batch.insert(batch))
    }

    fn build_batch(&self) -> Result<ValidatedBatch> {
        self.normalizer.check_volume(self.files.len())?;
        let variant = detect_variant(
            &self.files,
            &self.config.variant_keywords,
            &self.config.unknown_label,
        );
        let raw = self.normalizer.ingest(&self.files)?;
        Ok(validate(raw)?.with_variant(variant))
    }

    pub fn batch(&self) -> Option<&ValidatedBatch> {
        self.batch.as_ref()
    }

    /// Aggregates the current batch.
    pub fn aggregates(&self) -> Result<Aggregates> {
        let batch = self.batch.as_ref().ok_or_else(|| {
            ReportError::ExportPrecondition("no validated dataset, build one first".into())
        })?;
        Ok(aggregate(batch))
    }

    /// Aggregates the current batch and writes the report to the destination.
    pub fn export(&self) -> Result<ExportOutcome> {
        let destination = self.destination.as_deref().ok_or_else(|| {
            ReportError::ExportPrecondition("no destination directory selected".into())
        })?;
        let aggregates = self.aggregates()?;
        export(&aggregates, destination, &self.config.chart)
    }
}
