//! Data source adapter: remote endpoint or local JSON fixture.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::SourceConfig;
use crate::contract::Extractor;
use crate::error::PipelineError;
use crate::model::DonationRecord;

/// Records written to the fixture the first time local mode runs.
pub fn sample_records() -> Vec<DonationRecord> {
    vec![
        DonationRecord::new(1, 50.0, 101, "2025-05-03T10:00:00"),
        DonationRecord::new(2, 100.0, 102, "2025-05-03T10:01:00"),
        DonationRecord::new(1, 75.0, 101, "2025-05-03T10:02:00"),
    ]
}

/// Shape of the remote response body.
#[derive(Deserialize)]
struct RemoteEnvelope {
    data: Vec<DonationRecord>,
}

/// DefaultExtractor holds the source settings and one HTTP client with the
/// request timeout baked in.
pub struct DefaultExtractor {
    remote_url: String,
    fixture_path: PathBuf,
    client: Client,
}

impl DefaultExtractor {
    pub fn new(config: &SourceConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build HTTP client");
                PipelineError::source_unavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            remote_url: config.remote_url.clone(),
            fixture_path: config.fixture_path.clone(),
            client,
        })
    }

    async fn extract_remote(&self) -> Result<Vec<DonationRecord>, PipelineError> {
        info!(url = %self.remote_url, "Fetching donations from remote endpoint");

        let response = self.client.get(&self.remote_url).send().await.map_err(|e| {
            let reason = if e.is_timeout() { "timed out" } else { "request failed" };
            error!(error = ?e, url = %self.remote_url, reason, "Remote fetch failed");
            PipelineError::source_unavailable(format!("GET {} {reason}: {e}", self.remote_url))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %self.remote_url, "Remote endpoint returned error status");
            return Err(PipelineError::source_unavailable(format!(
                "GET {} returned {status}",
                self.remote_url
            )));
        }

        let body = response.text().await.map_err(|e| {
            error!(error = ?e, url = %self.remote_url, "Failed to read response body");
            PipelineError::source_unavailable(format!("failed to read response body: {e}"))
        })?;

        let envelope: RemoteEnvelope = serde_json::from_str(&body).map_err(|e| {
            error!(error = ?e, url = %self.remote_url, "Remote body is not a JSON object with a data array");
            PipelineError::malformed_source(format!("remote body: {e}"))
        })?;
        Ok(envelope.data)
    }

    fn extract_local(&self) -> Result<Vec<DonationRecord>, PipelineError> {
        let path = &self.fixture_path;
        if !path.exists() {
            seed_fixture(path)?;
        }

        let content = fs::read_to_string(path).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to read fixture");
            PipelineError::source_unavailable(format!("failed to read {}: {e}", path.display()))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Fixture is not a JSON array of records");
            PipelineError::malformed_source(format!("{}: {e}", path.display()))
        })
    }
}

#[async_trait]
impl Extractor for DefaultExtractor {
    async fn extract(&self, use_remote: bool) -> Result<Vec<DonationRecord>, PipelineError> {
        let result = if use_remote {
            self.extract_remote().await
        } else {
            self.extract_local()
        };
        match &result {
            Ok(records) => info!(
                stage = "extract",
                remote = use_remote,
                records = records.len(),
                "Extraction complete"
            ),
            Err(e) => error!(
                stage = "extract",
                remote = use_remote,
                kind = e.kind(),
                error = %e,
                "Extraction failed"
            ),
        }
        result
    }
}

/// Writes the sample records to `path`, creating parent directories.
/// The file is written under a temporary name first so a crash never leaves
/// a truncated fixture behind.
fn seed_fixture(path: &Path) -> Result<(), PipelineError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let unavailable = |what: &str, e: &dyn std::fmt::Display| {
        error!(error = %e, path = %path.display(), "Failed to {what}");
        PipelineError::source_unavailable(format!("failed to {what} {}: {e}", path.display()))
    };

    fs::create_dir_all(&dir).map_err(|e| unavailable("create fixture directory for", &e))?;
    let body = serde_json::to_vec_pretty(&sample_records())
        .map_err(|e| unavailable("serialize sample fixture", &e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| unavailable("create temporary fixture for", &e))?;
    tmp.write_all(&body)
        .map_err(|e| unavailable("write fixture", &e))?;
    tmp.persist(path)
        .map_err(|e| unavailable("persist fixture", &e.error))?;

    debug!(path = %path.display(), records = 3, "Seeded local fixture");
    Ok(())
}
