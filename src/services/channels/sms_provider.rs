//! SMS gateway sender implementation.
//!
//! Posts one message per recipient to the configured gateway endpoint and
//! reads the gateway-assigned message id from the JSON response.

use super::provider::{MessageSender, SendError, SendOutcome, classify_status, required_param};
use crate::config::settings::SmsChannelConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

/// SMS gateway sender
///
/// The gateway contract is a plain JSON POST:
/// request `{ "to", "body", "sender_id"? }` with a bearer key, response
/// `{ "message_id": "..." }` on acceptance or `{ "code": "..." }` on
/// rejection.
pub struct SmsSender {
    config: SmsChannelConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GatewayAccepted {
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct GatewayRejected {
    code: Option<String>,
}

impl SmsSender {
    /// Creates a new SMS sender over the shared HTTP client.
    pub fn new(config: SmsChannelConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl MessageSender for SmsSender {
    async fn send(&self, recipient: &str, params: &JsonValue) -> Result<SendOutcome, SendError> {
        let body = required_param(params, "body")?;

        let mut payload = json!({
            "to": recipient,
            "body": body,
        });
        if let Some(sender_id) = &self.config.sender_id {
            payload["sender_id"] = json!(sender_id);
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = response
                .json::<GatewayRejected>()
                .await
                .ok()
                .and_then(|r| r.code);
            return Err(classify_status(status, code));
        }

        let accepted: GatewayAccepted = response.json().await?;
        Ok(SendOutcome {
            provider_message_id: accepted.message_id,
        })
    }

    fn name(&self) -> &'static str {
        "sms"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> SmsChannelConfig {
        SmsChannelConfig {
            endpoint: format!("{}/v1/send", server.uri()),
            api_key: "k-test".to_string(),
            sender_id: Some("AGENCY".to_string()),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn accepted_send_returns_the_gateway_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/send"))
            .and(header("authorization", "Bearer k-test"))
            .and(body_partial_json(serde_json::json!({
                "to": "+15550100",
                "body": "hello",
                "sender_id": "AGENCY",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "message_id": "sms-abc-1"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sender = SmsSender::new(config(&server), reqwest::Client::new());
        let outcome = sender
            .send("+15550100", &serde_json::json!({"body": "hello"}))
            .await
            .unwrap();

        assert_eq!(outcome.provider_message_id, "sms-abc-1");
    }

    #[tokio::test]
    async fn invalid_number_is_classified_as_invalid_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(serde_json::json!({
                    "code": "invalid_msisdn"
                })),
            )
            .mount(&server)
            .await;

        let sender = SmsSender::new(config(&server), reqwest::Client::new());
        let err = sender
            .send("not-a-number", &serde_json::json!({"body": "hello"}))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::InvalidRecipient { .. }));
        assert_eq!(err.error_code(), "invalid_msisdn");
    }

    #[tokio::test]
    async fn missing_body_never_reaches_the_gateway() {
        let server = MockServer::start().await;
        // No mock mounted: a request would 404 and fail differently.
        let sender = SmsSender::new(config(&server), reqwest::Client::new());
        let err = sender
            .send("+15550100", &serde_json::json!({"subject": "x"}))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "missing_param_body");
    }
}
