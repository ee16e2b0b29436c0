//! Configuration loader for courier-rs
//!
//! Layered loading with the following precedence (lowest to highest):
//! 1. `default.toml` in the configuration directory
//! 2. `{environment}.toml`
//! 3. `local.toml` (not committed to version control)
//! 4. `COURIER_*` environment variables

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "COURIER_CONFIG_DIR";

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "COURIER";

/// Separator for nested configuration keys in environment variables,
/// e.g. `COURIER_DATABASE__URL` -> `database.url`
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
#[derive(Debug)]
pub struct ConfigLoader {
    /// Configuration directory path
    config_dir: PathBuf,
    /// Specific configuration file (if set, skips layered loading)
    config_file: Option<PathBuf>,
    /// Current application environment
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a loader using `COURIER_CONFIG_DIR` (or `config/`) and
    /// `COURIER_APP_ENV`.
    pub fn new() -> Self {
        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

        Self {
            config_dir,
            config_file: None,
            environment: AppEnvironment::from_env(),
        }
    }

    /// Create a loader that reads a single explicit file (the CLI's
    /// `--config` flag) plus environment variable overrides.
    pub fn with_file(path: PathBuf) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(path),
            environment: AppEnvironment::from_env(),
        }
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    /// Load and validate settings from all sources.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;
        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let mut builder = Config::builder();

        if let Some(ref config_file) = self.config_file {
            if !config_file.exists() {
                return Err(ConfigError::FileNotFound(
                    config_file.display().to_string(),
                ));
            }
            builder = builder.add_source(file_source(config_file, true));
        } else {
            // All layers are optional: a worker can be configured entirely
            // through environment variables.
            builder = builder
                .add_source(file_source(&self.config_dir.join("default.toml"), false))
                .add_source(file_source(
                    &self
                        .config_dir
                        .join(format!("{}.toml", self.environment.as_str())),
                    false,
                ))
                .add_source(file_source(&self.config_dir.join("local.toml"), false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        );

        builder.build().map_err(ConfigError::from)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn file_source(path: &Path, required: bool) -> File<config::FileSourceFile, FileFormat> {
    File::new(path.to_str().unwrap_or_default(), FileFormat::Toml).required(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_a_single_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "courier.toml",
            r#"
[database]
url = "postgres://localhost/courier_test"

[dispatch]
batch_size = 25
settle_after_secs = 45
"#,
        );

        let loader = ConfigLoader::with_file(dir.path().join("courier.toml"));
        let settings = loader.load().unwrap();

        assert_eq!(settings.database.url, "postgres://localhost/courier_test");
        assert_eq!(settings.dispatch.batch_size, 25);
        assert_eq!(settings.dispatch.settle_after_secs, 45);
        // Unset sections fall back to defaults.
        assert_eq!(settings.dispatch.worker_loops, 1);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let loader = ConfigLoader::with_file(PathBuf::from("/nonexistent/courier.toml"));
        assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn parses_channel_sections() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "courier.toml",
            r#"
[database]
url = "postgres://localhost/courier_test"

[channels.sms]
endpoint = "https://sms.example.com/v1/send"
api_key = "k-123"
sender_id = "AGENCY"

[channels.telegram]
bot_token = "42:token"
"#,
        );

        let settings = ConfigLoader::with_file(dir.path().join("courier.toml"))
            .load()
            .unwrap();

        let sms = settings.channels.sms.unwrap();
        assert_eq!(sms.sender_id.as_deref(), Some("AGENCY"));
        assert_eq!(sms.timeout_seconds, 30);

        let telegram = settings.channels.telegram.unwrap();
        assert_eq!(telegram.api_base, "https://api.telegram.org");
        assert!(settings.channels.whatsapp.is_none());
    }
}
