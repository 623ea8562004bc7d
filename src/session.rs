//! Interactive session state: the last successful run, kept for export.

use std::path::PathBuf;

use tracing::warn;

use crate::contract::{Extractor, Store};
use crate::error::PipelineError;
use crate::export::ExportFormat;
use crate::model::RunOutput;
use crate::pipeline::Pipeline;

/// Caches the output of the last successful run. Starting a new run drops the
/// cache first, so a failed run never leaves stale results exportable.
pub struct Session<'p, E: ?Sized = dyn Extractor, S: ?Sized = dyn Store> {
    pipeline: &'p Pipeline<E, S>,
    last_run: Option<RunOutput>,
}

impl<'p, E, S> Session<'p, E, S>
where
    E: Extractor + ?Sized,
    S: Store + ?Sized,
{
    pub fn new(pipeline: &'p Pipeline<E, S>) -> Self {
        Self {
            pipeline,
            last_run: None,
        }
    }

    pub async fn run(&mut self, use_remote: bool) -> Result<&RunOutput, PipelineError> {
        self.last_run = None;
        let output = self.pipeline.run(use_remote).await?;
        Ok(&*self.last_run.insert(output))
    }

    pub fn last_run(&self) -> Option<&RunOutput> {
        self.last_run.as_ref()
    }

    /// Exports the cached run's donations.
    pub fn export(&self, format: ExportFormat) -> Result<PathBuf, PipelineError> {
        match &self.last_run {
            Some(run) => self.pipeline.export(&run.donations, format),
            None => {
                warn!(stage = "export", "Export requested before a successful run");
                Err(PipelineError::export("no successful run to export"))
            }
        }
    }
}
