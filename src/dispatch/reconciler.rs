//! Reconciliation ("logging"): merging settled working sets back into the
//! durable message tables, refreshing statistics, and archiving jobs.
//!
//! A settling (`Sent`/`Stopped`) job is reconciled once its campaign's
//! working set has quiesced (no in-flight row, no sibling job still
//! dispatching), or once the staleness threshold has elapsed since the last
//! dispatch timestamp, at which point waiting longer would only stall the
//! campaign behind a lost provider response. Stale in-flight rows are failed
//! with a timeout code and merged like any other outcome.
//!
//! Every step is idempotent: reconciling an already-archived job is a no-op,
//! and a crash between steps is healed by the next pass.

use chrono::{NaiveDateTime, Utc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::config::DispatchConfig;
use crate::error::AppResult;
use crate::models::{Job, StatusCounts};
use crate::repositories::{Repositories, WorkingSetState};

/// Whether a campaign's working set has quiesced at `now`.
///
/// True when nothing is in flight, or when the most recent dispatch
/// timestamp is older than the staleness threshold (an abandoned in-flight
/// row that should be force-reconciled rather than waited on forever).
pub fn is_settled(state: &WorkingSetState, now: NaiveDateTime, settle_after: chrono::Duration) -> bool {
    if state.in_flight == 0 {
        return true;
    }
    match state.last_dispatch_at {
        Some(last) => last < now - settle_after,
        // In-flight rows with no dispatch timestamp cannot occur (the claim
        // stamps it), but treat them as settled rather than stalling.
        None => true,
    }
}

pub struct Reconciler {
    pub repos: Repositories,
    pub config: DispatchConfig,
}

impl Reconciler {
    /// Scan-and-reconcile until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                debug!("Reconciler cancelled");
                break;
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "Reconciliation pass failed");
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep(self.config.reconcile_interval()) => {}
            }
        }
    }

    /// One pass: drain every currently reconcilable job, skipping the ones
    /// whose working sets have not settled yet.
    pub async fn tick(&self) -> AppResult<()> {
        let mut not_settled: Vec<i64> = Vec::new();

        loop {
            let Some(job) = self.repos.jobs.next_settling(&not_settled).await? else {
                break;
            };

            let span = info_span!("reconcile", job.id = job.id, campaign.id = job.campaign_id);
            let job_id = job.id;
            if !self.reconcile_job(job).instrument(span).await? {
                not_settled.push(job_id);
            }
        }

        Ok(())
    }

    /// Reconciles one settling job. Returns false when the job's working set
    /// is not ready yet and the job should be revisited on a later pass.
    async fn reconcile_job(&self, job: Job) -> AppResult<bool> {
        let campaign = self.repos.campaigns.get(job.campaign_id).await?;
        let channel = campaign.channel;
        let now = Utc::now().naive_utc();

        // The working set is shared by every job of the campaign: merging it
        // away while a sibling is actively claiming from it would strand the
        // sibling. Wait for the whole campaign to go quiet.
        if self.repos.jobs.has_active_sibling(campaign.id, job.id).await? {
            debug!("Sibling job still dispatching; deferring");
            return Ok(false);
        }

        let state = self.repos.messages.working_set_state(channel, campaign.id).await?;
        if !is_settled(&state, now, self.config.settle_after()) {
            debug!(
                in_flight = state.in_flight,
                "Working set not settled; deferring"
            );
            return Ok(false);
        }

        let stale_before = now - self.config.settle_after();
        let merged = self
            .repos
            .messages
            .reconcile_working_set(channel, campaign.id, stale_before)
            .await?;

        let grouped = self
            .repos
            .messages
            .message_status_counts(channel, campaign.id)
            .await?;
        let counts = StatusCounts::from_grouped(&grouped);
        self.repos.statistics.upsert(campaign.id, counts).await?;

        // Exactly one reconciler wins the archival; losing just means a
        // concurrent instance already finished the job.
        let archived = self.repos.jobs.mark_logged(job.id).await?;
        info!(
            merged,
            unsent = counts.unsent,
            errored = counts.errored,
            sent = counts.sent,
            invalid = counts.invalid,
            archived,
            "Reconciled job"
        );

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state(in_flight: i64, last_dispatch_secs_ago: Option<i64>, now: NaiveDateTime) -> WorkingSetState {
        WorkingSetState {
            total: in_flight + 5,
            in_flight,
            last_dispatch_at: last_dispatch_secs_ago.map(|s| now - Duration::seconds(s)),
        }
    }

    #[test]
    fn settled_when_nothing_is_in_flight() {
        let now = Utc::now().naive_utc();
        assert!(is_settled(&state(0, None, now), now, Duration::seconds(20)));
        assert!(is_settled(&state(0, Some(1), now), now, Duration::seconds(20)));
    }

    #[test]
    fn fresh_in_flight_rows_block_settling() {
        let now = Utc::now().naive_utc();
        assert!(!is_settled(&state(3, Some(5), now), now, Duration::seconds(20)));
    }

    #[test]
    fn stale_in_flight_rows_force_settling() {
        let now = Utc::now().naive_utc();
        assert!(is_settled(&state(3, Some(25), now), now, Duration::seconds(20)));
        // Threshold is configurable; a larger one keeps waiting.
        assert!(!is_settled(&state(3, Some(25), now), now, Duration::seconds(60)));
    }

    // Executable statement of the reconciliation merge rule, mirroring the
    // set-based UPDATE in the message store: fields the receipt webhook
    // already wrote onto the message row win, except sent_at/delivered_at,
    // which always take the working-set value.
    mod merge_rule {
        use crate::models::{DispatchRow, DispatchStatus};
        use chrono::NaiveDateTime;

        fn merge(message: &DispatchRow, op: &DispatchRow) -> DispatchRow {
            DispatchRow {
                id: message.id,
                campaign_id: message.campaign_id,
                recipient: message.recipient.clone(),
                params: message.params.clone(),
                status: if matches!(
                    message.status,
                    DispatchStatus::Unsent | DispatchStatus::Sending
                ) {
                    op.status
                } else {
                    message.status
                },
                message_id: message.message_id.clone().or_else(|| op.message_id.clone()),
                error_code: message.error_code.clone().or_else(|| op.error_code.clone()),
                sent_at: op.sent_at,
                delivered_at: op.delivered_at,
                received_at: message.received_at.or(op.received_at),
                dequeued_at: None,
            }
        }

        fn row(status: DispatchStatus) -> DispatchRow {
            DispatchRow {
                id: 1,
                campaign_id: 1,
                recipient: "r".to_string(),
                params: serde_json::json!({}),
                message_id: None,
                error_code: None,
                status,
                dequeued_at: None,
                sent_at: None,
                delivered_at: None,
                received_at: None,
            }
        }

        fn ts(secs: i64) -> NaiveDateTime {
            chrono::DateTime::from_timestamp(1_770_000_000 + secs, 0)
                .unwrap()
                .naive_utc()
        }

        #[test]
        fn worker_outcome_lands_when_no_receipt_raced_it() {
            let mut message = row(DispatchStatus::Unsent);
            message.dequeued_at = Some(ts(0));

            let mut op = row(DispatchStatus::Success);
            op.message_id = Some("pm-1".to_string());
            op.sent_at = Some(ts(3));

            let merged = merge(&message, &op);
            assert_eq!(merged.status, DispatchStatus::Success);
            assert_eq!(merged.message_id.as_deref(), Some("pm-1"));
            assert_eq!(merged.sent_at, Some(ts(3)));
            assert_eq!(merged.dequeued_at, None, "row becomes retry-eligible");
        }

        #[test]
        fn receipt_that_arrived_first_is_authoritative() {
            // The webhook wrote a delivery failure onto the message row
            // before reconciliation ran; the op still says success.
            let mut message = row(DispatchStatus::Error);
            message.error_code = Some("undeliverable".to_string());
            message.received_at = Some(ts(8));

            let mut op = row(DispatchStatus::Success);
            op.message_id = Some("pm-2".to_string());
            op.sent_at = Some(ts(3));
            op.delivered_at = Some(ts(6));

            let merged = merge(&message, &op);
            assert_eq!(merged.status, DispatchStatus::Error);
            assert_eq!(merged.error_code.as_deref(), Some("undeliverable"));
            assert_eq!(merged.received_at, Some(ts(8)));
            // The asymmetric part of the rule: pipeline-owned timestamps
            // still come from the working set.
            assert_eq!(merged.sent_at, Some(ts(3)));
            assert_eq!(merged.delivered_at, Some(ts(6)));
            // The provider id was absent on the message row, so the op's
            // value fills it.
            assert_eq!(merged.message_id.as_deref(), Some("pm-2"));
        }

        #[test]
        fn remerging_an_already_merged_row_changes_nothing() {
            let mut op = row(DispatchStatus::Success);
            op.message_id = Some("pm-3".to_string());
            op.sent_at = Some(ts(3));

            let once = merge(&row(DispatchStatus::Unsent), &op);
            let twice = merge(&once, &op);
            assert_eq!(once.status, twice.status);
            assert_eq!(once.message_id, twice.message_id);
            assert_eq!(once.sent_at, twice.sent_at);
            assert_eq!(once.dequeued_at, twice.dequeued_at);
        }
    }
}
