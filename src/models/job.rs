//! Job queue models.
//!
//! A job is one claimable unit of dispatch work for a campaign, bounded by a
//! send-rate budget. Its status transitions are owned exclusively by workers
//! and the reconciler; the management layer may only force `Stopped`.

use chrono::NaiveDateTime;
use diesel::AsExpression;
use diesel::FromSqlRow;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Job lifecycle: `Ready → Enqueued → Sending → {Sent | Stopped} → Logged`.
///
/// `Stopped` is reachable from any non-`Logged` state. `Logged` is terminal
/// until a campaign-wide retry resets the queue to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ready,
    Enqueued,
    Sending,
    Sent,
    Stopped,
    Logged,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Ready => "ready",
            JobStatus::Enqueued => "enqueued",
            JobStatus::Sending => "sending",
            JobStatus::Sent => "sent",
            JobStatus::Stopped => "stopped",
            JobStatus::Logged => "logged",
        }
    }

    /// Whether a worker or the reconciler may move a job from `self` to `next`.
    ///
    /// Mirrors the conditional UPDATEs in the queue repository; the database
    /// enforces the transitions, this is the single place that states them.
    pub fn can_transition(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Ready, Enqueued)
                | (Enqueued, Sending)
                | (Sending, Sent)
                | (Sent, Logged)
                | (Stopped, Logged)
                | (Ready | Enqueued | Sending | Sent, Stopped)
                | (Logged, Ready)
        )
    }

    /// Terminal for the dispatch phase: the job will not claim more work.
    pub fn is_settling(self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Stopped)
    }

    pub fn is_archived(self) -> bool {
        matches!(self, JobStatus::Logged)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl diesel::query_builder::QueryId for JobStatus {
    type QueryId = JobStatus;
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl ToSql<Text, Pg> for JobStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for JobStatus {
    fn from_sql(
        bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "ready" => Ok(JobStatus::Ready),
            "enqueued" => Ok(JobStatus::Enqueued),
            "sending" => Ok(JobStatus::Sending),
            "sent" => Ok(JobStatus::Sent),
            "stopped" => Ok(JobStatus::Stopped),
            "logged" => Ok(JobStatus::Logged),
            _ => Err(format!("Unrecognized job status: {}", s).into()),
        }
    }
}

/// Job query model for SELECT operations
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::job_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Job {
    pub id: i64,
    pub campaign_id: i64,
    pub worker_id: Option<String>,
    pub send_rate: i32,
    pub status: JobStatus,
    pub visible_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Job {
    /// Claim-eligibility at `now`: ready and past its visibility delay.
    pub fn is_claimable(&self, now: NaiveDateTime) -> bool {
        self.status == JobStatus::Ready && self.visible_at.is_none_or(|at| at <= now)
    }
}

/// NewJob insert model for INSERT operations
#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = crate::schema::job_queue)]
pub struct NewJob {
    pub campaign_id: i64,
    pub send_rate: i32,
    pub status: JobStatus,
    pub visible_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn job(status: JobStatus, visible_at: Option<NaiveDateTime>) -> Job {
        let now = Utc::now().naive_utc();
        Job {
            id: 1,
            campaign_id: 7,
            worker_id: None,
            send_rate: 60,
            status,
            visible_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn lifecycle_transitions_are_legal() {
        use JobStatus::*;
        assert!(Ready.can_transition(Enqueued));
        assert!(Enqueued.can_transition(Sending));
        assert!(Sending.can_transition(Sent));
        assert!(Sent.can_transition(Logged));
        assert!(Stopped.can_transition(Logged));
        assert!(Logged.can_transition(Ready)); // campaign-wide retry
    }

    #[test]
    fn stop_reaches_every_non_archived_state() {
        use JobStatus::*;
        for status in [Ready, Enqueued, Sending, Sent] {
            assert!(status.can_transition(Stopped), "{status} must be stoppable");
        }
        assert!(!Logged.can_transition(Stopped));
    }

    #[test]
    fn skipping_states_is_illegal() {
        use JobStatus::*;
        assert!(!Ready.can_transition(Sending));
        assert!(!Enqueued.can_transition(Sent));
        assert!(!Sending.can_transition(Logged));
        assert!(!Sent.can_transition(Ready));
    }

    #[test]
    fn claimable_honors_visibility_delay() {
        let now = Utc::now().naive_utc();
        assert!(job(JobStatus::Ready, None).is_claimable(now));
        assert!(job(JobStatus::Ready, Some(now - Duration::seconds(1))).is_claimable(now));
        assert!(!job(JobStatus::Ready, Some(now + Duration::seconds(60))).is_claimable(now));
        assert!(!job(JobStatus::Sending, None).is_claimable(now));
    }
}
