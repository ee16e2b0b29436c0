//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{CampaignCommandHandler, MigrateCommandHandler, WorkCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Execute a CLI command with the given settings
///
/// This function dispatches to the appropriate command handler based on
/// the parsed CLI arguments. No subcommand defaults to `work`.
///
/// # Arguments
/// * `cli` - Parsed CLI arguments
/// * `settings` - Loaded settings (CLI overrides already applied)
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    if let Err(msg) = cli.validate() {
        return Err(AppError::Validation {
            field: "cli_arguments".to_string(),
            reason: msg,
        });
    }

    match &cli.command {
        Some(Commands::Work {
            worker_id,
            loops,
            dry_run,
        }) => {
            WorkCommandHandler::new(settings)
                .execute(worker_id.clone(), *loops, *dry_run)
                .await
        }
        None => WorkCommandHandler::new(settings).execute(None, None, false).await,
        Some(Commands::Migrate { dry_run, rollback }) => {
            MigrateCommandHandler::new(settings)
                .execute(*dry_run, *rollback)
                .await
        }
        Some(Commands::Campaign(command)) => {
            CampaignCommandHandler::new(settings).execute(command).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/test".to_string();
        config
    }

    #[tokio::test]
    async fn test_execute_work_dry_run() {
        let cli = Cli::try_parse_from(["courier-rs", "work", "--dry-run"]).unwrap();
        let config = create_valid_config();

        let result = execute_command(&cli, config).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_execute_rejects_invalid_argument_combinations() {
        let cli = Cli {
            command: Some(Commands::Migrate {
                dry_run: true,
                rollback: Some(5),
            }),
            config: None,
            env: None,
            verbose: false,
            quiet: false,
        };
        let config = create_valid_config();

        let result = execute_command(&cli, config).await;
        assert!(result.is_err());
    }
}
