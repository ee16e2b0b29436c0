//! Configuration settings structures for courier-rs
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "courier-rs".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_worker_loops() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_poll_jitter_ms() -> u64 {
    100
}

fn default_batch_size() -> i64 {
    50
}

fn default_materialize_chunk() -> i64 {
    1_000
}

fn default_send_concurrency() -> usize {
    10
}

fn default_max_job_rate() -> i32 {
    600
}

fn default_reconcile_interval_ms() -> u64 {
    2_000
}

fn default_settle_after_secs() -> u64 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Diesel database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Whether to automatically run pending migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL cannot be empty",
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Pool size must be at least 1",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Minimum pool size cannot exceed the maximum",
            ));
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

// ============================================================================
// Dispatch Configuration
// ============================================================================

/// Worker/reconciler tuning for the dispatch pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of worker loops to run in this process
    #[serde(default = "default_worker_loops")]
    pub worker_loops: usize,

    /// How often an idle worker polls the job queue, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum random jitter added to each poll, in milliseconds
    #[serde(default = "default_poll_jitter_ms")]
    pub poll_jitter_ms: u64,

    /// Rows claimed from the working set per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Message rows moved into the working set per materialization chunk
    #[serde(default = "default_materialize_chunk")]
    pub materialize_chunk: i64,

    /// Concurrent provider calls per claimed batch
    #[serde(default = "default_send_concurrency")]
    pub send_concurrency: usize,

    /// Upper bound on a single job's send rate (messages/minute); campaign
    /// launches split their aggregate rate into slices at most this large
    #[serde(default = "default_max_job_rate")]
    pub max_job_rate: i32,

    /// How often the reconciler scans for settling jobs, in milliseconds
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    /// Seconds after the most recent dispatch timestamp at which an
    /// unsettled working set is force-reconciled anyway
    #[serde(default = "default_settle_after_secs")]
    pub settle_after_secs: u64,
}

impl DispatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_jitter(&self) -> Duration {
        Duration::from_millis(self.poll_jitter_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn settle_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.settle_after_secs as i64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_loops == 0 {
            return Err(ConfigError::validation(
                "dispatch.worker_loops",
                "At least one worker loop is required",
            ));
        }
        if self.batch_size <= 0 {
            return Err(ConfigError::validation(
                "dispatch.batch_size",
                "Batch size must be positive",
            ));
        }
        if self.materialize_chunk <= 0 {
            return Err(ConfigError::validation(
                "dispatch.materialize_chunk",
                "Materialization chunk must be positive",
            ));
        }
        if self.send_concurrency == 0 {
            return Err(ConfigError::validation(
                "dispatch.send_concurrency",
                "Send concurrency must be at least 1",
            ));
        }
        if self.max_job_rate <= 0 {
            return Err(ConfigError::validation(
                "dispatch.max_job_rate",
                "Per-job rate cap must be positive",
            ));
        }
        if self.settle_after_secs == 0 {
            return Err(ConfigError::validation(
                "dispatch.settle_after_secs",
                "Staleness threshold must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_loops: default_worker_loops(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_jitter_ms: default_poll_jitter_ms(),
            batch_size: default_batch_size(),
            materialize_chunk: default_materialize_chunk(),
            send_concurrency: default_send_concurrency(),
            max_job_rate: default_max_job_rate(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            settle_after_secs: default_settle_after_secs(),
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Tracing subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ============================================================================
// Channel Provider Configuration
// ============================================================================

/// SMS gateway API credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsChannelConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Alphanumeric sender shown to recipients, when the gateway supports it
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

/// Transactional email relay API credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChannelConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from_address: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

/// Telegram bot API credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramChannelConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    pub bot_token: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

/// WhatsApp Business API credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsappChannelConfig {
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,
    pub phone_number_id: String,
    pub access_token: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

/// Government message-channel API credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovchatChannelConfig {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

/// Per-channel provider configuration; a channel without configuration
/// cannot be dispatched by this process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub sms: Option<SmsChannelConfig>,
    #[serde(default)]
    pub email: Option<EmailChannelConfig>,
    #[serde(default)]
    pub telegram: Option<TelegramChannelConfig>,
    #[serde(default)]
    pub whatsapp: Option<WhatsappChannelConfig>,
    #[serde(default)]
    pub govchat: Option<GovchatChannelConfig>,
}

// ============================================================================
// Root Settings
// ============================================================================

/// Root configuration for the courier-rs process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub channels: ChannelsConfig,
}

impl Settings {
    /// Validates the full configuration tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.dispatch.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let settings = Settings::default();
        // Only the database URL is missing from a default configuration.
        assert!(settings.database.validate().is_err());
        assert!(settings.dispatch.validate().is_ok());
        assert_eq!(settings.dispatch.settle_after_secs, 20);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/courier".to_string();
        settings.dispatch.batch_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_pool_bounds() {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/courier".to_string();
        settings.database.min_connections = 20;
        settings.database.max_connections = 5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn channel_configs_default_to_disabled() {
        let settings = Settings::default();
        assert!(settings.channels.sms.is_none());
        assert!(settings.channels.govchat.is_none());
    }

    #[test]
    fn settle_after_converts_to_chrono_duration() {
        let mut dispatch = DispatchConfig::default();
        dispatch.settle_after_secs = 45;
        assert_eq!(dispatch.settle_after(), chrono::Duration::seconds(45));
    }
}
