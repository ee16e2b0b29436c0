//! Core channel sender trait and types.
//!
//! The pipeline consumes every provider API through this single contract:
//! one recipient and its rendered params in, a provider message id out (or a
//! classified failure). Credentials and endpoints live in the `[channels]`
//! configuration; clients are constructed once at startup and injected.

use crate::models::{AttemptOutcome, DispatchRow};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result of a successful provider call.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Provider-assigned message id; delivery receipts are keyed by it.
    pub provider_message_id: String,
}

/// A classified per-recipient send failure.
///
/// These are terminal for the attempt: the worker records them on the
/// working-set row and moves on. They never fail the job.
#[derive(Debug, Error)]
pub enum SendError {
    /// The provider judged the recipient address itself unusable; the row is
    /// excluded from future retries.
    #[error("invalid recipient: {code}")]
    InvalidRecipient { code: String },

    /// The provider rejected or failed the send for this recipient.
    #[error("send rejected: {code}")]
    Rejected { code: String },

    /// The request never produced a provider verdict (connect error,
    /// timeout, malformed response).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SendError {
    /// Stable error code persisted to the row's `error_code` column.
    pub fn error_code(&self) -> String {
        match self {
            SendError::InvalidRecipient { code } | SendError::Rejected { code } => code.clone(),
            SendError::Transport(e) if e.is_timeout() => "transport_timeout".to_string(),
            SendError::Transport(e) if e.is_connect() => "transport_connect".to_string(),
            SendError::Transport(_) => "transport".to_string(),
        }
    }

    /// Folds a completed provider call into the write-back for its op row.
    pub fn into_outcome(self, op: &DispatchRow) -> AttemptOutcome {
        match &self {
            SendError::InvalidRecipient { .. } => {
                AttemptOutcome::invalid_recipient(op.id, self.error_code())
            }
            _ => AttemptOutcome::failed(op.id, self.error_code()),
        }
    }
}

/// Maps an HTTP error status to a send error, using the provider's error
/// code when one was extracted from the response body.
pub fn classify_status(status: reqwest::StatusCode, code: Option<String>) -> SendError {
    let code = code.unwrap_or_else(|| format!("http_{}", status.as_u16()));
    if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
        SendError::InvalidRecipient { code }
    } else {
        SendError::Rejected { code }
    }
}

/// Pulls a required string out of a message's rendered params.
pub fn required_param<'a>(params: &'a JsonValue, key: &str) -> Result<&'a str, SendError> {
    params
        .get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| SendError::Rejected {
            code: format!("missing_param_{key}"),
        })
}

/// Trait for channel senders (SMS gateway, email relay, chat-bot APIs).
///
/// Uses `async_trait` to support async methods with dynamic dispatch.
/// All senders must be Send + Sync for use in async contexts.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Dispatches one message to one recipient.
    ///
    /// # Arguments
    /// * `recipient` - Channel-specific address (phone number, email, chat id)
    /// * `params` - The message row's rendered params map
    async fn send(&self, recipient: &str, params: &JsonValue) -> Result<SendOutcome, SendError>;

    /// Returns the channel name for logging/debugging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op_row() -> DispatchRow {
        DispatchRow {
            id: 11,
            campaign_id: 1,
            recipient: "+15550100".to_string(),
            params: json!({"body": "hi"}),
            message_id: None,
            error_code: None,
            status: crate::models::DispatchStatus::Sending,
            dequeued_at: None,
            sent_at: None,
            delivered_at: None,
            received_at: None,
        }
    }

    #[test]
    fn invalid_recipient_maps_to_invalid_status() {
        let outcome = SendError::InvalidRecipient {
            code: "bad_number".to_string(),
        }
        .into_outcome(&op_row());
        assert_eq!(outcome.status, crate::models::DispatchStatus::InvalidRecipient);
        assert_eq!(outcome.error_code.as_deref(), Some("bad_number"));
        assert_eq!(outcome.op_id, 11);
    }

    #[test]
    fn rejection_maps_to_error_status() {
        let outcome = SendError::Rejected {
            code: "quota".to_string(),
        }
        .into_outcome(&op_row());
        assert_eq!(outcome.status, crate::models::DispatchStatus::Error);
        assert_eq!(outcome.error_code.as_deref(), Some("quota"));
    }

    #[test]
    fn status_classification_uses_body_code_when_present() {
        let err = classify_status(reqwest::StatusCode::BAD_REQUEST, Some("rate_limited".into()));
        assert_eq!(err.error_code(), "rate_limited");

        let err = classify_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, None);
        assert_eq!(err.error_code(), "http_500");
    }

    #[test]
    fn unprocessable_entity_means_invalid_recipient() {
        let err = classify_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, None);
        assert!(matches!(err, SendError::InvalidRecipient { .. }));
    }

    #[test]
    fn missing_params_are_reported_by_key() {
        let err = required_param(&json!({}), "body").unwrap_err();
        assert_eq!(err.error_code(), "missing_param_body");
        assert_eq!(required_param(&json!({"body": "x"}), "body").unwrap(), "x");
    }
}
