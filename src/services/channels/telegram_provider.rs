//! Telegram bot API sender implementation.

use super::provider::{MessageSender, SendError, SendOutcome, required_param};
use crate::config::settings::TelegramChannelConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

/// Telegram sender using the bot `sendMessage` method; the recipient is a
/// chat id previously registered with the bot.
pub struct TelegramSender {
    config: TelegramChannelConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    result: Option<BotMessage>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotMessage {
    message_id: i64,
}

impl TelegramSender {
    pub fn new(config: TelegramChannelConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, recipient: &str, params: &JsonValue) -> Result<SendOutcome, SendError> {
        let body = required_param(params, "body")?;

        let response = self
            .client
            .post(self.send_message_url())
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(&json!({
                "chat_id": recipient,
                "text": body,
            }))
            .send()
            .await?;

        // The bot API reports failures in the JSON envelope, not the HTTP
        // status alone.
        let parsed: BotResponse = response.json().await?;
        if !parsed.ok {
            let description = parsed.description.unwrap_or_default();
            return if description.contains("chat not found") {
                Err(SendError::InvalidRecipient {
                    code: "chat_not_found".to_string(),
                })
            } else {
                Err(SendError::Rejected {
                    code: format!("telegram:{}", description),
                })
            };
        }

        let message = parsed.result.ok_or_else(|| SendError::Rejected {
            code: "telegram:missing_result".to_string(),
        })?;

        Ok(SendOutcome {
            provider_message_id: message.message_id.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sender(server: &MockServer) -> TelegramSender {
        TelegramSender::new(
            TelegramChannelConfig {
                api_base: server.uri(),
                bot_token: "42:token".to_string(),
                timeout_seconds: 5,
            },
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn bot_token_is_part_of_the_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot42:token/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"message_id": 777}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = sender(&server)
            .send("123456", &serde_json::json!({"body": "hi"}))
            .await
            .unwrap();

        assert_eq!(outcome.provider_message_id, "777");
    }

    #[tokio::test]
    async fn chat_not_found_is_an_invalid_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = sender(&server)
            .send("0", &serde_json::json!({"body": "hi"}))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::InvalidRecipient { .. }));
    }
}
