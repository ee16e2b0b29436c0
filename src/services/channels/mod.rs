//! Channel sender implementations.
//!
//! All five provider APIs sit behind the [`MessageSender`] contract; from the
//! worker loop's point of view they are interchangeable. Senders are built
//! once at startup from the `[channels]` configuration over one shared HTTP
//! client and passed in explicitly.

mod email_provider;
mod govchat_provider;
mod provider;
mod sms_provider;
mod telegram_provider;
mod whatsapp_provider;

pub use email_provider::EmailSender;
pub use govchat_provider::GovchatSender;
pub use provider::{MessageSender, SendError, SendOutcome};
pub use sms_provider::SmsSender;
pub use telegram_provider::TelegramSender;
pub use whatsapp_provider::WhatsappSender;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ChannelsConfig;
use crate::models::ChannelKind;

/// The set of senders this process can dispatch with, keyed by channel.
///
/// A channel absent from the configuration is absent here, and the worker
/// will not claim jobs for it.
#[derive(Clone, Default)]
pub struct ChannelSenders {
    senders: HashMap<ChannelKind, Arc<dyn MessageSender>>,
}

impl ChannelSenders {
    /// Builds senders for every configured channel over the shared client.
    pub fn from_config(config: &ChannelsConfig, client: reqwest::Client) -> Self {
        let mut senders: HashMap<ChannelKind, Arc<dyn MessageSender>> = HashMap::new();

        if let Some(sms) = &config.sms {
            senders.insert(
                ChannelKind::Sms,
                Arc::new(SmsSender::new(sms.clone(), client.clone())),
            );
        }
        if let Some(email) = &config.email {
            senders.insert(
                ChannelKind::Email,
                Arc::new(EmailSender::new(email.clone(), client.clone())),
            );
        }
        if let Some(telegram) = &config.telegram {
            senders.insert(
                ChannelKind::Telegram,
                Arc::new(TelegramSender::new(telegram.clone(), client.clone())),
            );
        }
        if let Some(whatsapp) = &config.whatsapp {
            senders.insert(
                ChannelKind::Whatsapp,
                Arc::new(WhatsappSender::new(whatsapp.clone(), client.clone())),
            );
        }
        if let Some(govchat) = &config.govchat {
            senders.insert(
                ChannelKind::Govchat,
                Arc::new(GovchatSender::new(govchat.clone(), client)),
            );
        }

        Self { senders }
    }

    pub fn get(&self, channel: ChannelKind) -> Option<Arc<dyn MessageSender>> {
        self.senders.get(&channel).cloned()
    }

    /// Channels this process is able to dispatch.
    pub fn configured(&self) -> Vec<ChannelKind> {
        let mut channels: Vec<ChannelKind> = self.senders.keys().copied().collect();
        channels.sort_by_key(|c| c.as_str());
        channels
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::SmsChannelConfig;

    #[test]
    fn only_configured_channels_get_senders() {
        let config = ChannelsConfig {
            sms: Some(SmsChannelConfig {
                endpoint: "https://sms.example.com".to_string(),
                api_key: "k".to_string(),
                sender_id: None,
                timeout_seconds: 5,
            }),
            ..Default::default()
        };

        let senders = ChannelSenders::from_config(&config, reqwest::Client::new());
        assert_eq!(senders.configured(), vec![ChannelKind::Sms]);
        assert!(senders.get(ChannelKind::Sms).is_some());
        assert!(senders.get(ChannelKind::Email).is_none());
    }

    #[test]
    fn empty_config_builds_no_senders() {
        let senders = ChannelSenders::from_config(&ChannelsConfig::default(), reqwest::Client::new());
        assert!(senders.is_empty());
    }
}
