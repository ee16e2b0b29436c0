//! Crash recovery for abandoned jobs.
//!
//! A worker that dies mid-`Sending` leaves its jobs owned in the queue;
//! nothing else will touch them, because every other worker sees them as
//! taken. Recovery runs under the same worker identity, at process startup
//! and again at orderly shutdown, and resets those jobs to `Ready` with the
//! owner cleared, making them claimable again.
//!
//! The working set needs no separate sweep: rows the dead worker never
//! claimed are still `unsent` in the ops table and will be drained by the
//! next job run, and rows it left in flight are failed by the reconciler's
//! staleness threshold.

use tracing::{info, warn};

use crate::error::AppResult;
use crate::repositories::Repositories;

/// Resets every job still owned by any of this process's worker-loop
/// identities (`{worker_base}-{n}`). Returns the number of jobs recovered.
pub async fn resume_abandoned_jobs(repos: &Repositories, worker_base: &str) -> AppResult<usize> {
    let recovered = repos.jobs.resume_abandoned_prefix(worker_base).await?;

    if recovered > 0 {
        warn!(
            worker = worker_base,
            jobs = recovered,
            "Recovered jobs abandoned by a previous run"
        );
    } else {
        info!(worker = worker_base, "No abandoned jobs to recover");
    }

    Ok(recovered)
}
