//! Load stage: persist a transformed run through a [`Store`].

use tracing::{error, info};

use crate::contract::Store;
use crate::error::PipelineError;
use crate::model::{CampaignStats, ProcessedDonation};

/// Appends `donations` and replaces the stats snapshot in one transaction.
pub async fn load<S>(
    store: &S,
    donations: &[ProcessedDonation],
    stats: &[CampaignStats],
) -> Result<(), PipelineError>
where
    S: Store + ?Sized,
{
    match store.write_run(donations, stats).await {
        Ok(()) => {
            info!(
                stage = "load",
                backend = store.backend(),
                records = donations.len(),
                campaigns = stats.len(),
                "Load complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                stage = "load",
                backend = store.backend(),
                records = donations.len(),
                kind = e.kind(),
                error = %e,
                "Load failed"
            );
            Err(e)
        }
    }
}
