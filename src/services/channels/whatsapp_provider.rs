//! WhatsApp Business API sender implementation.

use super::provider::{MessageSender, SendError, SendOutcome, classify_status, required_param};
use crate::config::settings::WhatsappChannelConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

pub struct WhatsappSender {
    config: WhatsappChannelConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CloudApiResponse {
    messages: Vec<CloudApiMessage>,
}

#[derive(Debug, Deserialize)]
struct CloudApiMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CloudApiError {
    error: Option<CloudApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CloudApiErrorBody {
    code: Option<i64>,
}

impl WhatsappSender {
    pub fn new(config: WhatsappChannelConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }
}

#[async_trait]
impl MessageSender for WhatsappSender {
    async fn send(&self, recipient: &str, params: &JsonValue) -> Result<SendOutcome, SendError> {
        let body = required_param(params, "body")?;

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.config.access_token)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(&json!({
                "messaging_product": "whatsapp",
                "to": recipient,
                "type": "text",
                "text": {"body": body},
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = response
                .json::<CloudApiError>()
                .await
                .ok()
                .and_then(|e| e.error)
                .and_then(|e| e.code)
                .map(|c| format!("wa_{c}"));
            return Err(classify_status(status, code));
        }

        let parsed: CloudApiResponse = response.json().await?;
        let message = parsed.messages.into_iter().next().ok_or(SendError::Rejected {
            code: "wa_missing_message".to_string(),
        })?;

        Ok(SendOutcome {
            provider_message_id: message.id,
        })
    }

    fn name(&self) -> &'static str {
        "whatsapp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_joins_base_and_phone_number_id() {
        let sender = WhatsappSender::new(
            WhatsappChannelConfig {
                api_base: "https://graph.facebook.com/v19.0/".to_string(),
                phone_number_id: "1098765".to_string(),
                access_token: "t".to_string(),
                timeout_seconds: 5,
            },
            reqwest::Client::new(),
        );
        assert_eq!(
            sender.messages_url(),
            "https://graph.facebook.com/v19.0/1098765/messages"
        );
    }
}
