//! Campaign service: the triggering surface consumed by the management
//! layer (and the CLI).
//!
//! Launching splits a campaign's aggregate send rate into per-job slices no
//! larger than the configured per-job cap, so throughput spreads across
//! workers without any single job exceeding a provider-safe rate.

use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::models::{
    Campaign, DeliveryReceipt, Job, JobStatus, NewCampaign, NewJob, Statistics,
};
use crate::repositories::{RecipientSeed, Repositories};

/// Splits an aggregate messages/minute rate into slices of at most
/// `max_per_job`, preserving the total.
pub fn split_rate(rate: i32, max_per_job: i32) -> Vec<i32> {
    debug_assert!(max_per_job > 0);
    let mut slices = Vec::new();
    let mut remaining = rate.max(0);
    while remaining > 0 {
        let slice = remaining.min(max_per_job);
        slices.push(slice);
        remaining -= slice;
    }
    slices
}

/// Campaign service handling launch, stop, retry, and the boundary writes
/// (recipient seeding, delivery receipts).
#[derive(Clone)]
pub struct CampaignService {
    repos: Repositories,
    max_job_rate: i32,
}

impl CampaignService {
    pub fn new(repos: Repositories, max_job_rate: i32) -> Self {
        Self {
            repos,
            max_job_rate,
        }
    }

    /// Starts (or restarts) dispatching a campaign: one `Ready` job per rate
    /// slice, visible from the campaign's scheduled time if it has one.
    ///
    /// # Arguments
    /// * `campaign_id` - The campaign to launch
    /// * `requested_rate` - Aggregate messages/minute; defaults to the
    ///   campaign's own target rate
    pub async fn launch(
        &self,
        campaign_id: i64,
        requested_rate: Option<i32>,
    ) -> AppResult<Vec<Job>> {
        let campaign = self.repos.campaigns.get(campaign_id).await?;

        let rate = requested_rate.unwrap_or(campaign.send_rate);
        if rate <= 0 {
            return Err(AppError::Validation {
                field: "send_rate".to_string(),
                reason: "Send rate must be positive".to_string(),
            });
        }

        // A previously stopped campaign is resumed by launching it again.
        if campaign.halted {
            self.repos.campaigns.set_halted(campaign_id, false).await?;
        }

        let mut jobs = Vec::new();
        for slice in split_rate(rate, self.max_job_rate) {
            let job = self
                .repos
                .jobs
                .create(NewJob {
                    campaign_id,
                    send_rate: slice,
                    status: JobStatus::Ready,
                    visible_at: campaign.visible_at,
                })
                .await?;
            tracing::info!(
                job.id = job.id,
                campaign.id = campaign_id,
                job.send_rate = slice,
                "Created dispatch job"
            );
            jobs.push(job);
        }

        Ok(jobs)
    }

    /// Halts the campaign and stops every non-archived job. Idempotent.
    ///
    /// Advisory for in-flight work: provider calls already issued complete
    /// and are reconciled normally.
    pub async fn stop(&self, campaign_id: i64) -> AppResult<usize> {
        let stopped = self.repos.jobs.stop_campaign(campaign_id).await?;
        self.repos.campaigns.set_halted(campaign_id, true).await?;
        tracing::info!(campaign.id = campaign_id, jobs = stopped, "Stopped campaign");
        Ok(stopped)
    }

    /// Re-arms every job of the campaign, but only once all of them are
    /// archived; a retry while work is in flight is a silent no-op (returns
    /// false) to avoid double-dispatch. Callers needing confirmation poll
    /// job status.
    pub async fn retry(&self, campaign_id: i64) -> AppResult<bool> {
        let now = Utc::now().naive_utc();
        let reset = self.repos.jobs.retry_campaign(campaign_id, now).await?;
        if reset {
            // Stop halts the campaign; a successful retry re-arms it.
            self.repos.campaigns.set_halted(campaign_id, false).await?;
            tracing::info!(campaign.id = campaign_id, "Campaign re-armed for retry");
        } else {
            tracing::debug!(
                campaign.id = campaign_id,
                "Retry ignored: campaign has non-archived jobs"
            );
        }
        Ok(reset)
    }

    pub async fn statistics(&self, campaign_id: i64) -> AppResult<Option<Statistics>> {
        self.repos.statistics.get(campaign_id).await
    }

    pub async fn jobs(&self, campaign_id: i64) -> AppResult<Vec<Job>> {
        self.repos.jobs.for_campaign(campaign_id).await
    }

    /// Boundary write for the upstream upload layer: bulk-insert recipients
    /// into the campaign's channel message table.
    pub async fn seed_recipients(
        &self,
        campaign_id: i64,
        recipients: Vec<(String, JsonValue)>,
    ) -> AppResult<usize> {
        let campaign = self.repos.campaigns.get(campaign_id).await?;
        let seeds: Vec<RecipientSeed> = recipients
            .into_iter()
            .map(|(recipient, params)| RecipientSeed { recipient, params })
            .collect();
        self.repos
            .messages
            .insert_messages(campaign.channel, campaign_id, &seeds)
            .await
    }

    /// Boundary write for the delivery-receipt webhook: applies a receipt to
    /// the in-flight op row if one exists, else to the durable message row.
    /// Idempotent; tolerates receipts arriving before the worker's own
    /// write-back.
    pub async fn record_receipt(
        &self,
        campaign_id: i64,
        receipt: DeliveryReceipt,
    ) -> AppResult<bool> {
        let campaign = self.repos.campaigns.get(campaign_id).await?;
        self.repos
            .messages
            .record_receipt(campaign.channel, &receipt)
            .await
    }

    /// Insert path for embedding applications and tests.
    pub async fn create_campaign(&self, campaign: NewCampaign) -> AppResult<Campaign> {
        self.repos.campaigns.create(campaign).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rate_splits_into_capped_slices() {
        assert_eq!(split_rate(1500, 600), vec![600, 600, 300]);
        assert_eq!(split_rate(600, 600), vec![600]);
        assert_eq!(split_rate(1, 600), vec![1]);
        assert_eq!(split_rate(0, 600), Vec::<i32>::new());
    }

    proptest! {
        #[test]
        fn slices_preserve_the_total_and_honor_the_cap(
            rate in 1i32..100_000,
            max in 1i32..5_000,
        ) {
            let slices = split_rate(rate, max);
            prop_assert_eq!(slices.iter().sum::<i32>(), rate);
            prop_assert!(slices.iter().all(|s| *s > 0 && *s <= max));
            // Only the last slice may be partial.
            for slice in &slices[..slices.len() - 1] {
                prop_assert_eq!(*slice, max);
            }
        }
    }
}
