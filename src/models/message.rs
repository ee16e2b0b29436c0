//! Message and working-set (op) row models.
//!
//! Message tables hold one durable row per (campaign, recipient). Op tables
//! hold the transient per-campaign working set: a copy of the dispatch-
//! relevant fields of each claimed message, keyed by the same id. The five
//! channel table pairs share this exact shape, so one row struct serves all
//! of them.

use chrono::NaiveDateTime;
use diesel::AsExpression;
use diesel::FromSqlRow;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::Write;

/// Per-recipient dispatch status.
///
/// `Sending` on a durable message row means "dispatched, no receipt yet";
/// statistics count it in the `sent` bucket together with `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Unsent,
    Sending,
    Success,
    Error,
    InvalidRecipient,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Unsent => "unsent",
            DispatchStatus::Sending => "sending",
            DispatchStatus::Success => "success",
            DispatchStatus::Error => "error",
            DispatchStatus::InvalidRecipient => "invalid_recipient",
        }
    }

    /// Eligible for (re-)materialization into a working set: never sent, or
    /// errored on a previous attempt. Invalid recipients are not retried.
    pub fn is_retryable(self) -> bool {
        matches!(self, DispatchStatus::Unsent | DispatchStatus::Error)
    }

    /// A concluded attempt; `Sending` is the only in-flight value.
    pub fn is_terminal(self) -> bool {
        !matches!(self, DispatchStatus::Unsent | DispatchStatus::Sending)
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl diesel::query_builder::QueryId for DispatchStatus {
    type QueryId = DispatchStatus;
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl ToSql<Text, Pg> for DispatchStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for DispatchStatus {
    fn from_sql(
        bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "unsent" => Ok(DispatchStatus::Unsent),
            "sending" => Ok(DispatchStatus::Sending),
            "success" => Ok(DispatchStatus::Success),
            "error" => Ok(DispatchStatus::Error),
            "invalid_recipient" => Ok(DispatchStatus::InvalidRecipient),
            _ => Err(format!("Unrecognized dispatch status: {}", s).into()),
        }
    }
}

/// Explicit reading of the `dequeued_at` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// Not claimed by any working set; eligible for a future attempt if the
    /// status is retryable.
    Idle,
    /// Claimed into its campaign's working set since the given instant.
    Claimed(NaiveDateTime),
}

/// One row of a message or op table; both shapes are identical, so a single
/// order-based `Queryable` struct serves every channel table.
#[derive(Debug, Clone, Queryable, Serialize)]
pub struct DispatchRow {
    pub id: i64,
    pub campaign_id: i64,
    pub recipient: String,
    pub params: JsonValue,
    pub message_id: Option<String>,
    pub error_code: Option<String>,
    pub status: DispatchStatus,
    pub dequeued_at: Option<NaiveDateTime>,
    pub sent_at: Option<NaiveDateTime>,
    pub delivered_at: Option<NaiveDateTime>,
    pub received_at: Option<NaiveDateTime>,
}

impl DispatchRow {
    pub fn claim_state(&self) -> ClaimState {
        match self.dequeued_at {
            None => ClaimState::Idle,
            Some(at) => ClaimState::Claimed(at),
        }
    }
}

/// Outcome of one provider call, written back to the op row that was claimed
/// for it. Provider failures are terminal for the attempt; they become
/// retryable again only through a campaign-wide retry.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub op_id: i64,
    pub status: DispatchStatus,
    pub message_id: Option<String>,
    pub error_code: Option<String>,
}

impl AttemptOutcome {
    pub fn accepted(op_id: i64, provider_message_id: String) -> Self {
        Self {
            op_id,
            status: DispatchStatus::Success,
            message_id: Some(provider_message_id),
            error_code: None,
        }
    }

    pub fn failed(op_id: i64, error_code: String) -> Self {
        Self {
            op_id,
            status: DispatchStatus::Error,
            message_id: None,
            error_code: Some(error_code),
        }
    }

    pub fn invalid_recipient(op_id: i64, error_code: String) -> Self {
        Self {
            op_id,
            status: DispatchStatus::InvalidRecipient,
            message_id: None,
            error_code: Some(error_code),
        }
    }
}

/// A delivery receipt pushed by a provider webhook, keyed by the provider
/// message id. Receipts may arrive more than once and may arrive before the
/// worker's own write-back.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryReceipt {
    pub provider_message_id: String,
    pub status: DispatchStatus,
    pub error_code: Option<String>,
    pub delivered_at: Option<NaiveDateTime>,
    pub received_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(status: DispatchStatus, dequeued_at: Option<NaiveDateTime>) -> DispatchRow {
        DispatchRow {
            id: 1,
            campaign_id: 3,
            recipient: "+15550100".to_string(),
            params: serde_json::json!({"body": "hello"}),
            message_id: None,
            error_code: None,
            status,
            dequeued_at,
            sent_at: None,
            delivered_at: None,
            received_at: None,
        }
    }

    #[test]
    fn claim_state_reads_the_sentinel() {
        let now = Utc::now().naive_utc();
        assert_eq!(row(DispatchStatus::Unsent, None).claim_state(), ClaimState::Idle);
        assert_eq!(
            row(DispatchStatus::Sending, Some(now)).claim_state(),
            ClaimState::Claimed(now)
        );
    }

    #[test]
    fn only_unsent_and_error_are_retryable() {
        assert!(DispatchStatus::Unsent.is_retryable());
        assert!(DispatchStatus::Error.is_retryable());
        assert!(!DispatchStatus::Success.is_retryable());
        assert!(!DispatchStatus::Sending.is_retryable());
        assert!(!DispatchStatus::InvalidRecipient.is_retryable());
    }

    #[test]
    fn sending_is_not_terminal() {
        assert!(!DispatchStatus::Sending.is_terminal());
        assert!(!DispatchStatus::Unsent.is_terminal());
        assert!(DispatchStatus::Success.is_terminal());
        assert!(DispatchStatus::Error.is_terminal());
        assert!(DispatchStatus::InvalidRecipient.is_terminal());
    }
}
