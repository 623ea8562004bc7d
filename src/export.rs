//! Export of cleaned donations to CSV or JSON lines.

use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::PipelineError;
use crate::model::ProcessedDonation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Header row plus one row per record.
    Csv,
    /// One JSON object per line.
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes `donations` to `export_<YYYYMMDD_HHMMSS>.<ext>` and returns the path.
    pub fn export(
        &self,
        donations: &[ProcessedDonation],
        format: ExportFormat,
    ) -> Result<PathBuf, PipelineError> {
        self.export_at(donations, format, Local::now())
    }

    /// Same as [`Exporter::export`] with an explicit clock reading for the file name.
    pub fn export_at(
        &self,
        donations: &[ProcessedDonation],
        format: ExportFormat,
        now: DateTime<Local>,
    ) -> Result<PathBuf, PipelineError> {
        let result = self.write(donations, format, now);
        match &result {
            Ok(path) => info!(
                stage = "export",
                path = %path.display(),
                format = %format,
                records = donations.len(),
                "Export complete"
            ),
            Err(e) => error!(
                stage = "export",
                dir = %self.output_dir.display(),
                format = %format,
                kind = e.kind(),
                error = %e,
                "Export failed"
            ),
        }
        result
    }

    fn write(
        &self,
        donations: &[ProcessedDonation],
        format: ExportFormat,
        now: DateTime<Local>,
    ) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            PipelineError::export(format!("failed to create {}: {e}", self.output_dir.display()))
        })?;

        // Content goes to a temp file in the same directory, then gets renamed,
        // so a failed export leaves nothing behind.
        let tmp = tempfile::NamedTempFile::new_in(&self.output_dir)
            .map_err(|e| PipelineError::export(format!("failed to create temp file: {e}")))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            match format {
                ExportFormat::Csv => write_csv(&mut writer, donations)?,
                ExportFormat::Json => write_json_lines(&mut writer, donations)?,
            }
            writer
                .flush()
                .map_err(|e| PipelineError::export(format!("failed to flush export: {e}")))?;
        }

        let target = self.free_path(now, format);
        tmp.persist_noclobber(&target).map_err(|e| {
            PipelineError::export(format!("failed to write {}: {}", target.display(), e.error))
        })?;
        Ok(target)
    }

    /// First `export_<stamp>[_n].<ext>` name that does not exist yet.
    fn free_path(&self, now: DateTime<Local>, format: ExportFormat) -> PathBuf {
        let stem = format!("export_{}", now.format("%Y%m%d_%H%M%S"));
        let ext = format.extension();
        let mut candidate = self.output_dir.join(format!("{stem}.{ext}"));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.output_dir.join(format!("{stem}_{n}.{ext}"));
            n += 1;
        }
        candidate
    }
}

fn write_csv<W: Write>(writer: W, donations: &[ProcessedDonation]) -> Result<(), PipelineError> {
    let mut csv = csv::Writer::from_writer(writer);
    if donations.is_empty() {
        csv.write_record(["donor_id", "amount", "campaign_id", "timestamp", "processed_at"])
            .map_err(|e| PipelineError::export(format!("csv: {e}")))?;
    }
    for d in donations {
        csv.serialize(d)
            .map_err(|e| PipelineError::export(format!("csv: {e}")))?;
    }
    csv.flush()
        .map_err(|e| PipelineError::export(format!("csv: {e}")))
}

fn write_json_lines<W: Write>(
    mut writer: W,
    donations: &[ProcessedDonation],
) -> Result<(), PipelineError> {
    for d in donations {
        serde_json::to_writer(&mut writer, d)
            .map_err(|e| PipelineError::export(format!("json: {e}")))?;
        writer
            .write_all(b"\n")
            .map_err(|e| PipelineError::export(format!("json: {e}")))?;
    }
    Ok(())
}
