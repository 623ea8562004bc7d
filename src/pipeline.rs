//! High-level pipeline: orchestrates extract → transform → load.
//!
//! [`Pipeline`] owns one implementation of each seam ([`Extractor`], [`Store`])
//! plus the [`Transformer`] and [`Exporter`], and exposes:
//!
//! - [`Pipeline::run`]: the full ETL run, fail-fast, no partial success.
//! - [`Pipeline::export`]: serialise a run's cleaned records.
//!
//! Each run is wrapped in a `run` span carrying a fresh `run_id`, so every
//! stage event in the log can be tied back to its run.
//!
//! # Error Handling
//! Every stage logs its own failure with context. The orchestrator adds one
//! `Pipeline failed` event and returns the stage's error unchanged.

use std::path::PathBuf;

use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::contract::{Extractor, Store};
use crate::error::PipelineError;
use crate::export::{ExportFormat, Exporter};
use crate::extract::DefaultExtractor;
use crate::load::load;
use crate::model::{CampaignStats, ProcessedDonation, RunOutput};
use crate::store;
use crate::transform::Transformer;

pub struct Pipeline<E: ?Sized = dyn Extractor, S: ?Sized = dyn Store> {
    extractor: Box<E>,
    transformer: Transformer,
    store: Box<S>,
    exporter: Exporter,
}

impl Pipeline {
    /// Wires the default extractor and the configured store backend.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let extractor: Box<dyn Extractor> = Box::new(DefaultExtractor::new(&config.source)?);
        Ok(Self {
            extractor,
            transformer: Transformer::new(config.source.timestamp_policy),
            store: store::connect(&config.storage),
            exporter: Exporter::new(config.export.output_dir.clone()),
        })
    }
}

impl<E, S> Pipeline<E, S>
where
    E: Extractor + ?Sized,
    S: Store + ?Sized,
{
    pub fn new(extractor: Box<E>, transformer: Transformer, store: Box<S>, exporter: Exporter) -> Self {
        Self {
            extractor,
            transformer,
            store,
            exporter,
        }
    }

    /// Extract, transform and load once.
    pub async fn run(&self, use_remote: bool) -> Result<RunOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, remote = use_remote);
        async move {
            info!("Pipeline starting");
            match self.run_stages(use_remote).await {
                Ok((donations, stats)) => {
                    info!(
                        records = donations.len(),
                        campaigns = stats.len(),
                        "Pipeline complete"
                    );
                    Ok(RunOutput {
                        run_id,
                        donations,
                        stats,
                    })
                }
                Err(e) => {
                    error!(kind = e.kind(), error = %e, "Pipeline failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        use_remote: bool,
    ) -> Result<(Vec<ProcessedDonation>, Vec<CampaignStats>), PipelineError> {
        let records = self.extractor.extract(use_remote).await?;
        let output = self.transformer.transform(records)?;
        load(self.store.as_ref(), &output.donations, &output.stats).await?;
        Ok((output.donations, output.stats))
    }

    /// Export cleaned records in `format`; returns the written file.
    pub fn export(
        &self,
        donations: &[ProcessedDonation],
        format: ExportFormat,
    ) -> Result<PathBuf, PipelineError> {
        self.exporter.export(donations, format)
    }
}
