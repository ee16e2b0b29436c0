//! Transactional email relay sender implementation.

use super::provider::{MessageSender, SendError, SendOutcome, classify_status, required_param};
use crate::config::settings::EmailChannelConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

/// Email relay sender
///
/// Speaks the relay's JSON submission API; the relay handles MIME assembly
/// and SMTP delivery. `params` must carry `subject` and `body`.
pub struct EmailSender {
    config: EmailChannelConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RelayAccepted {
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct RelayRejected {
    code: Option<String>,
}

impl EmailSender {
    pub fn new(config: EmailChannelConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl MessageSender for EmailSender {
    async fn send(&self, recipient: &str, params: &JsonValue) -> Result<SendOutcome, SendError> {
        let subject = required_param(params, "subject")?;
        let body = required_param(params, "body")?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(&json!({
                "from": self.config.from_address,
                "to": recipient,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = response
                .json::<RelayRejected>()
                .await
                .ok()
                .and_then(|r| r.code);
            return Err(classify_status(status, code));
        }

        let accepted: RelayAccepted = response.json().await?;
        Ok(SendOutcome {
            provider_message_id: accepted.message_id,
        })
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn submission_includes_the_configured_from_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(serde_json::json!({
                "from": "noreply@agency.example",
                "to": "citizen@example.com",
                "subject": "Notice",
            })))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(serde_json::json!({"message_id": "em-9"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sender = EmailSender::new(
            EmailChannelConfig {
                endpoint: format!("{}/messages", server.uri()),
                api_key: "k".to_string(),
                from_address: "noreply@agency.example".to_string(),
                timeout_seconds: 5,
            },
            reqwest::Client::new(),
        );

        let outcome = sender
            .send(
                "citizen@example.com",
                &serde_json::json!({"subject": "Notice", "body": "Dear citizen"}),
            )
            .await
            .unwrap();

        assert_eq!(outcome.provider_message_id, "em-9");
    }
}
