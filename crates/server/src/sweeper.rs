//! Background expiry sweep.

use crate::metrics;
use courier_storage::{ArtifactRepository, SweepStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Run one sweep pass and record its outcome.
///
/// Returns `None` when the pass failed; the failure is logged and counted.
pub async fn run_sweep(repository: &dyn ArtifactRepository) -> Option<SweepStats> {
    let timer = metrics::SWEEP_DURATION.start_timer();
    match repository.sweep().await {
        Ok(stats) => {
            timer.observe_duration();
            metrics::record_sweep(&stats);
            Some(stats)
        }
        Err(e) => {
            timer.stop_and_discard();
            metrics::SWEEP_ERRORS.inc();
            tracing::error!(error = %e, "artifact sweep failed");
            None
        }
    }
}

/// Spawn the periodic sweep.
///
/// The first pass runs one `interval` after startup. A pass that fails or
/// panics is logged and the next tick still fires.
pub fn spawn_sweeper(repository: Arc<dyn ArtifactRepository>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let repository = repository.clone();
            let pass = tokio::spawn(async move { run_sweep(repository.as_ref()).await });
            match pass.await {
                Ok(Some(stats)) if stats.files_deleted > 0 || stats.errors > 0 => {
                    tracing::info!(
                        deleted = stats.files_deleted,
                        directories = stats.directories_removed,
                        errors = stats.errors,
                        "Artifact sweep reclaimed expired files"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    metrics::SWEEP_ERRORS.inc();
                    tracing::error!(error = %e, "artifact sweep task panicked");
                }
            }
        }
    })
}
