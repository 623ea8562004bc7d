//! Periodic re-execution of the pipeline.

use std::time::Duration;

use tracing::{error, info};

use crate::contract::{Extractor, Store};
use crate::pipeline::Pipeline;

/// Saturates instead of overflowing on absurd intervals.
pub fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

/// Runs the local-source pipeline every `interval`, forever. Failed runs are
/// logged and the loop waits for the next tick.
pub async fn schedule_pipeline<E, S>(pipeline: &Pipeline<E, S>, interval: Duration)
where
    E: Extractor + ?Sized,
    S: Store + ?Sized,
{
    run_scheduled(pipeline, interval, None).await;
}

/// Bounded form of [`schedule_pipeline`]: stops after `max_ticks` runs when
/// given. Returns the number of runs that succeeded.
pub async fn run_scheduled<E, S>(
    pipeline: &Pipeline<E, S>,
    interval: Duration,
    max_ticks: Option<usize>,
) -> usize
where
    E: Extractor + ?Sized,
    S: Store + ?Sized,
{
    info!(interval_secs = interval.as_secs(), "Scheduler started");
    let mut ticks = 0;
    let mut succeeded = 0;
    while max_ticks.map_or(true, |max| ticks < max) {
        tokio::time::sleep(interval).await;
        ticks += 1;
        info!(tick = ticks, "Starting scheduled pipeline run");
        match pipeline.run(false).await {
            Ok(output) => {
                succeeded += 1;
                info!(tick = ticks, run_id = %output.run_id, "Scheduled pipeline run complete");
            }
            Err(e) => {
                error!(tick = ticks, kind = e.kind(), error = %e, "Scheduled pipeline run failed");
            }
        }
    }
    succeeded
}
