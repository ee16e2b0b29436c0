//! Government message-channel sender implementation.
//!
//! The channel authenticates with client credentials per request and returns
//! a protocol number that doubles as the provider message id.

use super::provider::{MessageSender, SendError, SendOutcome, classify_status};
use crate::config::settings::GovchatChannelConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

pub struct GovchatSender {
    config: GovchatChannelConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GovchatAccepted {
    protocol: String,
}

#[derive(Debug, Deserialize)]
struct GovchatRejected {
    code: Option<String>,
}

impl GovchatSender {
    pub fn new(config: GovchatChannelConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl MessageSender for GovchatSender {
    async fn send(&self, recipient: &str, params: &JsonValue) -> Result<SendOutcome, SendError> {
        // The gov channel renders server-side from the full params map; no
        // single field is mandatory here.
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-client-id", &self.config.client_id)
            .header("x-client-secret", &self.config.client_secret)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(&json!({
                "recipient": recipient,
                "payload": params,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = response
                .json::<GovchatRejected>()
                .await
                .ok()
                .and_then(|r| r.code);
            return Err(classify_status(status, code));
        }

        let accepted: GovchatAccepted = response.json().await?;
        Ok(SendOutcome {
            provider_message_id: accepted.protocol,
        })
    }

    fn name(&self) -> &'static str {
        "govchat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn client_credentials_travel_as_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-client-id", "agency-1"))
            .and(header("x-client-secret", "s3cret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"protocol": "2026-000123"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sender = GovchatSender::new(
            GovchatChannelConfig {
                endpoint: server.uri(),
                client_id: "agency-1".to_string(),
                client_secret: "s3cret".to_string(),
                timeout_seconds: 5,
            },
            reqwest::Client::new(),
        );

        let outcome = sender
            .send("12345678900", &serde_json::json!({"notice_id": 9}))
            .await
            .unwrap();

        assert_eq!(outcome.provider_message_id, "2026-000123");
    }
}
