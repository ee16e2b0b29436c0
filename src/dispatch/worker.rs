//! The worker loop: poll, claim, drain.
//!
//! One worker loop owns at most one job at a time. Claiming is decided by
//! the queue repository's conditional transitions, so any number of loops
//! (in this process or others) can poll the same queue. After claiming, the
//! loop materializes the campaign's working set, then drains it in
//! rate-paced batches: claim a skip-locked batch, fan the provider calls
//! out, write each outcome back to the row that was claimed for it.

use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::config::DispatchConfig;
use crate::dispatch::rate::SendPacer;
use crate::error::AppResult;
use crate::models::{AttemptOutcome, Campaign, Job, JobStatus};
use crate::repositories::Repositories;
use crate::services::channels::ChannelSenders;

pub struct Worker {
    pub repos: Repositories,
    pub senders: ChannelSenders,
    pub config: DispatchConfig,
    /// This loop's claim identity, stamped into `job_queue.worker_id`.
    pub worker_id: String,
}

impl Worker {
    /// Calculate the sleep duration with random jitter applied.
    fn sleep_duration_with_jitter(&self) -> Duration {
        let jitter = self.config.poll_jitter();
        if jitter.is_zero() {
            return self.config.poll_interval();
        }

        let jitter_millis = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
        let random_jitter = rand::rng().random_range(0..=jitter_millis);
        self.config.poll_interval() + Duration::from_millis(random_jitter)
    }

    /// Poll and dispatch until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                debug!("Worker loop cancelled");
                break;
            }

            match self.claim_and_run(&cancel).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    let sleep_duration = self.sleep_duration_with_jitter();
                    trace!("No claimable job found. Polling again in {sleep_duration:?}…");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sleep(sleep_duration) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "Dispatch cycle failed");
                    // Put whatever this loop still owns back on the queue so
                    // a transient storage error cannot strand a job until
                    // the next process restart.
                    if let Err(e) = self.repos.jobs.resume_abandoned(&self.worker_id).await {
                        warn!(error = %e, "Failed to release owned jobs after error");
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sleep(self.sleep_duration_with_jitter()) => {}
                    }
                }
            }
        }
    }

    /// Claim the next job and drain it.
    ///
    /// Returns:
    /// - `Ok(Some(job_id))` if a job was claimed and worked on
    /// - `Ok(None)` if no job was claimable
    async fn claim_and_run(&self, cancel: &CancellationToken) -> AppResult<Option<i64>> {
        let now = chrono::Utc::now().naive_utc();
        let channels = self.senders.configured();

        let Some(job) = self
            .repos
            .jobs
            .claim_next(&self.worker_id, &channels, now)
            .await?
        else {
            return Ok(None);
        };

        let campaign = self.repos.campaigns.get(job.campaign_id).await?;
        let span = info_span!(
            "job",
            job.id = job.id,
            campaign.id = campaign.id,
            channel = %campaign.channel,
        );
        let job_id = job.id;

        self.run_job(job, campaign, cancel).instrument(span).await?;

        Ok(Some(job_id))
    }

    async fn run_job(
        &self,
        job: Job,
        campaign: Campaign,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let channel = campaign.channel;

        let moved = self
            .repos
            .messages
            .materialize(channel, campaign.id, self.config.materialize_chunk)
            .await?;
        debug!(rows = moved, "Materialized working set");

        // A stop may have landed between claim and here; the conditional
        // transition notices and this worker simply walks away. The
        // reconciler picks the stopped job up.
        if !self
            .repos
            .jobs
            .try_transition(job.id, JobStatus::Enqueued, JobStatus::Sending)
            .await?
        {
            debug!("Job no longer enqueued; leaving it to the reconciler");
            return Ok(());
        }

        let pacer = SendPacer::new(job.send_rate);
        let batch_limit = pacer.batch_limit(self.config.batch_size);

        loop {
            // Stop is advisory: it flips the job's status, and this re-read
            // is where the worker notices. In-flight batches still complete.
            let current = self.repos.jobs.get(job.id).await?;
            if current.status != JobStatus::Sending {
                info!(status = %current.status, "Job no longer sending; ending drain");
                return Ok(());
            }

            let batch = self
                .repos
                .messages
                .claim_batch(channel, campaign.id, batch_limit)
                .await?;

            if batch.is_empty() {
                // Working set drained. Exactly one worker wins this
                // transition; the reconciler takes it from there.
                if self
                    .repos
                    .jobs
                    .try_transition(job.id, JobStatus::Sending, JobStatus::Sent)
                    .await?
                {
                    info!("Working set drained; job marked sent");
                }
                return Ok(());
            }

            let started = tokio::time::Instant::now();
            let batch_len = batch.len();
            self.dispatch_batch(channel, batch).await?;

            // Sleep off the rest of this batch's share of the minute.
            let window = pacer.batch_window(batch_len);
            if let Some(rest) = window.checked_sub(started.elapsed()) {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        // Leave the job in Sending; shutdown recovery
                        // releases it for another worker.
                        debug!("Cancelled mid-drain");
                        return Ok(());
                    }
                    _ = sleep(rest) => {}
                }
            }
            if cancel.is_cancelled() {
                debug!("Cancelled mid-drain");
                return Ok(());
            }
        }
    }

    /// Fans one claimed batch out to the provider and writes every outcome
    /// back. Each row is written exactly once, by the call that claimed it;
    /// provider failures are per-row outcomes, never loop errors.
    async fn dispatch_batch(
        &self,
        channel: crate::models::ChannelKind,
        batch: Vec<crate::models::DispatchRow>,
    ) -> AppResult<()> {
        let Some(sender) = self.senders.get(channel) else {
            // Claim filtering keeps undispatchable channels out; reaching
            // this means the configuration changed under us.
            return Err(crate::error::AppError::Provider {
                channel: channel.to_string(),
                reason: "no sender configured".to_string(),
            });
        };

        let results: Vec<(crate::models::DispatchRow, _)> =
            futures::stream::iter(batch.into_iter().map(|op| {
                let sender = sender.clone();
                async move {
                    let result = sender.send(&op.recipient, &op.params).await;
                    (op, result)
                }
            }))
            .buffer_unordered(self.config.send_concurrency)
            .collect()
            .await;

        for (op, result) in results {
            let outcome = match result {
                Ok(accepted) => {
                    trace!(op.id = op.id, provider_message_id = %accepted.provider_message_id, "Dispatched");
                    AttemptOutcome::accepted(op.id, accepted.provider_message_id)
                }
                Err(send_error) => {
                    debug!(op.id = op.id, error = %send_error, "Send failed");
                    send_error.into_outcome(&op)
                }
            };
            self.repos.messages.record_attempt(channel, &outcome).await?;
        }

        Ok(())
    }
}
