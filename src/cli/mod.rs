//! CLI module for courier-rs
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing with clap
//! - Configuration loading with CLI overrides
//! - Command execution and validation
//! - Command handlers for work, migrate, and campaign operations

pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

// Re-export public types for convenience
pub use executor::execute_command;
pub use parser::{CampaignCommands, Cli, Commands, Environment};

use crate::config::settings::Settings;
use crate::config::{ConfigError, ConfigLoader};

/// Load settings honoring CLI arguments.
///
/// `--config FILE` switches to single-file loading; `--env` overrides the
/// detected environment (by setting the detection variable before the
/// loader reads it); `--verbose`/`--quiet` override the logging level.
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    if let Some(env) = &cli.env {
        let env: crate::config::Environment = env.clone().into();
        // SAFETY: called from main before any other thread is spawned.
        unsafe { std::env::set_var(crate::config::Environment::ENV_VAR, env.as_str()) };
    }

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut settings = loader.load()?;

    if cli.verbose {
        settings.logging.level = "debug".to_string();
    } else if cli.quiet {
        settings.logging.level = "error".to_string();
    }

    Ok(settings)
}
