//! Job queue repository: the dispatch claim protocol.
//!
//! Two storage primitives carry all cross-process coordination:
//!
//! 1. Conditional state transitions: `UPDATE job_queue SET status = S2
//!    WHERE id = ? AND status = S1` with the affected-row count checked, so
//!    exactly one worker wins any race to advance a job.
//! 2. Lock-skipping claim reads: `SELECT .. FOR UPDATE SKIP LOCKED`, so
//!    concurrent workers pull disjoint rows without blocking each other.
//!
//! Losing a conditional transition is not an error; callers treat it as
//! "someone else has it" and move on.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ChannelKind, Job, JobStatus, NewJob};
use crate::schema::{campaigns, job_queue};

/// Job queue repository
#[derive(Clone)]
pub struct JobQueueRepository {
    pool: AsyncDbPool,
}

impl JobQueueRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> AppResult<diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>>
    {
        self.pool.get().await.map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })
    }

    /// Inserts a `Ready` job for the campaign with the given rate slice.
    ///
    /// Several jobs may coexist for one campaign; each is claimed and drained
    /// independently, which is how a campaign's aggregate rate spreads over
    /// multiple workers.
    pub async fn create(&self, new_job: NewJob) -> AppResult<Job> {
        let mut conn = self.conn().await?;

        diesel::insert_into(job_queue::table)
            .values(&new_job)
            .returning(Job::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn get(&self, job_id: i64) -> AppResult<Job> {
        let mut conn = self.conn().await?;

        job_queue::table
            .find(job_id)
            .select(Job::as_select())
            .first(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::NotFound {
                    entity: "Job".to_string(),
                    field: "id".to_string(),
                    value: job_id.to_string(),
                },
                _ => AppError::from(e),
            })
    }

    pub async fn for_campaign(&self, campaign_id: i64) -> AppResult<Vec<Job>> {
        let mut conn = self.conn().await?;

        job_queue::table
            .filter(job_queue::campaign_id.eq(campaign_id))
            .order(job_queue::id.asc())
            .select(Job::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Claims the next eligible `Ready` job for this worker, restricted to
    /// campaigns on channels this process can dispatch and not halted.
    ///
    /// The skip-locked read keeps concurrent pollers off each other's
    /// candidate row; the conditional `Ready -> Enqueued` update is what
    /// actually decides ownership. Returns `None` when the queue is empty
    /// (or every candidate was taken while we raced for it).
    pub async fn claim_next(
        &self,
        worker: &str,
        channels: &[ChannelKind],
        now: NaiveDateTime,
    ) -> AppResult<Option<Job>> {
        let mut conn = self.conn().await?;
        let worker = worker.to_string();
        let channels = channels.to_vec();

        conn.transaction::<Option<Job>, AppError, _>(|conn| {
            async move {
                // Subquery instead of a join: FOR UPDATE on a join would
                // also lock the campaign row and make concurrent claims on
                // sibling jobs skip each other.
                let dispatchable = campaigns::table
                    .filter(campaigns::halted.eq(false))
                    .filter(campaigns::channel.eq_any(channels))
                    .select(campaigns::id);

                let candidate: Option<i64> = job_queue::table
                    .filter(job_queue::status.eq(JobStatus::Ready))
                    .filter(
                        job_queue::visible_at
                            .is_null()
                            .or(job_queue::visible_at.le(now)),
                    )
                    .filter(job_queue::campaign_id.eq_any(dispatchable))
                    .order(job_queue::created_at.asc())
                    .limit(1)
                    .select(job_queue::id)
                    .for_update()
                    .skip_locked()
                    .first(conn)
                    .await
                    .optional()?;

                let Some(job_id) = candidate else {
                    return Ok(None);
                };

                let claimed = diesel::update(
                    job_queue::table
                        .filter(job_queue::id.eq(job_id))
                        .filter(job_queue::status.eq(JobStatus::Ready)),
                )
                .set((
                    job_queue::status.eq(JobStatus::Enqueued),
                    job_queue::worker_id.eq(Some(worker.clone())),
                    job_queue::updated_at.eq(now),
                ))
                .returning(Job::as_returning())
                .get_result(conn)
                .await
                .optional()?;

                Ok(claimed)
            }
            .scope_boxed()
        })
        .await
    }

    /// Conditional transition `from -> to`; true iff this caller won it.
    pub async fn try_transition(
        &self,
        job_id: i64,
        from: JobStatus,
        to: JobStatus,
    ) -> AppResult<bool> {
        debug_assert!(from.can_transition(to), "illegal transition {from} -> {to}");

        let mut conn = self.conn().await?;

        let affected = diesel::update(
            job_queue::table
                .filter(job_queue::id.eq(job_id))
                .filter(job_queue::status.eq(from)),
        )
        .set((
            job_queue::status.eq(to),
            job_queue::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)?;

        Ok(affected == 1)
    }

    /// Archives a settling job: `{Sent | Stopped} -> Logged`, clearing the
    /// owner. True iff this caller performed the archival.
    pub async fn mark_logged(&self, job_id: i64) -> AppResult<bool> {
        let mut conn = self.conn().await?;

        let affected = diesel::update(
            job_queue::table
                .filter(job_queue::id.eq(job_id))
                .filter(job_queue::status.eq_any([JobStatus::Sent, JobStatus::Stopped])),
        )
        .set((
            job_queue::status.eq(JobStatus::Logged),
            job_queue::worker_id.eq(None::<String>),
            job_queue::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)?;

        Ok(affected == 1)
    }

    /// Stops every non-archived job of the campaign. Idempotent; jobs already
    /// `Logged` (or `Stopped`) are left alone.
    pub async fn stop_campaign(&self, campaign_id: i64) -> AppResult<usize> {
        let mut conn = self.conn().await?;

        diesel::update(
            job_queue::table
                .filter(job_queue::campaign_id.eq(campaign_id))
                .filter(job_queue::status.ne_all([JobStatus::Logged, JobStatus::Stopped])),
        )
        .set((
            job_queue::status.eq(JobStatus::Stopped),
            job_queue::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    /// Re-arms every job of the campaign for another dispatch cycle, but only
    /// if all of them are `Logged`. Reissuing work that is still in flight
    /// would double-dispatch, so anything else makes this a silent no-op.
    ///
    /// Returns true when the jobs were reset.
    pub async fn retry_campaign(&self, campaign_id: i64, now: NaiveDateTime) -> AppResult<bool> {
        let mut conn = self.conn().await?;

        conn.transaction::<bool, AppError, _>(|conn| {
            async move {
                // Lock the campaign's jobs so a concurrent claim or stop
                // cannot slip between the check and the reset.
                let statuses: Vec<JobStatus> = job_queue::table
                    .filter(job_queue::campaign_id.eq(campaign_id))
                    .select(job_queue::status)
                    .for_update()
                    .load(conn)
                    .await?;

                if statuses.is_empty() || statuses.iter().any(|s| !s.is_archived()) {
                    return Ok(false);
                }

                diesel::update(job_queue::table.filter(job_queue::campaign_id.eq(campaign_id)))
                    .set((
                        job_queue::status.eq(JobStatus::Ready),
                        job_queue::worker_id.eq(None::<String>),
                        job_queue::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;

                Ok(true)
            }
            .scope_boxed()
        })
        .await
    }

    /// Returns every job still owned by the given worker identity to `Ready`
    /// with the owner cleared. Run at worker startup so a crashed
    /// predecessor's jobs become claimable again.
    pub async fn resume_abandoned(&self, worker: &str) -> AppResult<usize> {
        let mut conn = self.conn().await?;

        diesel::update(
            job_queue::table
                .filter(job_queue::worker_id.eq(worker))
                .filter(job_queue::status.eq_any([JobStatus::Enqueued, JobStatus::Sending])),
        )
        .set((
            job_queue::status.eq(JobStatus::Ready),
            job_queue::worker_id.eq(None::<String>),
            job_queue::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    /// Prefix variant of [`resume_abandoned`](Self::resume_abandoned) for
    /// process startup: worker loops claim as `{base}-{n}`, and a restarted
    /// process must recover every loop identity its predecessor may have
    /// used, even if the configured loop count shrank.
    pub async fn resume_abandoned_prefix(&self, worker_base: &str) -> AppResult<usize> {
        let mut conn = self.conn().await?;

        diesel::update(
            job_queue::table
                .filter(job_queue::worker_id.like(format!("{worker_base}-%")))
                .filter(job_queue::status.eq_any([JobStatus::Enqueued, JobStatus::Sending])),
        )
        .set((
            job_queue::status.eq(JobStatus::Ready),
            job_queue::worker_id.eq(None::<String>),
            job_queue::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    /// Picks a settling (`Sent`/`Stopped`) job for reconciliation, oldest
    /// first, ignoring the given job ids (the caller's not-yet-settled
    /// deferrals for this pass). Skip-locked so concurrent reconciler
    /// instances fan out over different jobs; the final `mark_logged`
    /// transition is what guarantees single archival.
    pub async fn next_settling(&self, excluding: &[i64]) -> AppResult<Option<Job>> {
        let mut conn = self.conn().await?;
        let excluding = excluding.to_vec();

        conn.transaction::<Option<Job>, AppError, _>(|conn| {
            async move {
                let job = job_queue::table
                    .filter(job_queue::status.eq_any([JobStatus::Sent, JobStatus::Stopped]))
                    .filter(job_queue::id.ne_all(excluding))
                    .order(job_queue::updated_at.asc())
                    .limit(1)
                    .select(Job::as_select())
                    .for_update()
                    .skip_locked()
                    .first(conn)
                    .await
                    .optional()?;

                Ok(job)
            }
            .scope_boxed()
        })
        .await
    }

    /// Whether another job of the campaign is actively dispatching. Used by
    /// the reconciler: merging the shared working set out from under an
    /// active sibling would strand rows the sibling was about to claim.
    pub async fn has_active_sibling(&self, campaign_id: i64, job_id: i64) -> AppResult<bool> {
        let mut conn = self.conn().await?;

        let count: i64 = job_queue::table
            .filter(job_queue::campaign_id.eq(campaign_id))
            .filter(job_queue::id.ne(job_id))
            .filter(job_queue::status.eq_any([JobStatus::Enqueued, JobStatus::Sending]))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(count > 0)
    }
}
