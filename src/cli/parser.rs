//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// Include shadow-rs generated build information
use shadow_rs::shadow;
shadow!(build);

/// Bulk-message campaign dispatch worker
#[derive(Parser, Debug)]
#[command(name = "courier-rs")]
#[command(about = "Bulk-message campaign dispatch worker")]
#[command(long_about = "
Courier-rs drains campaign dispatch jobs from a shared Postgres queue and
sends per-recipient messages through the configured channel providers
(SMS, email, Telegram, WhatsApp, govchat). Any number of worker processes
may run against the same database; coordination happens in the queue.

EXAMPLES:
    # Run worker loops and the reconciler with the default configuration
    courier-rs work

    # Run four worker loops under a stable claim identity
    courier-rs work --worker-id dispatch-a --loops 4

    # Use a specific configuration file
    courier-rs --config /etc/courier-rs/production.toml work

    # Apply pending database migrations
    courier-rs migrate

    # Launch, stop, retry, and inspect a campaign
    courier-rs campaign launch --id 42 --rate 1200
    courier-rs campaign stop --id 42
    courier-rs campaign retry --id 42
    courier-rs campaign stats --id 42

For more information about configuration options, see the documentation.
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Specify a custom configuration file to use instead of the layered
    /// `config/` directory. The file must exist and be readable TOML.
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Force the application to use a specific environment configuration
    /// instead of reading COURIER_APP_ENV.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Raises log output to debug level. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Reduces log output to error level only. Cannot be used with
    /// --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dispatch worker loops and reconciler (default)
    ///
    /// Polls the job queue, claims jobs, drains their working sets through
    /// the channel providers, and reconciles finished jobs back into the
    /// message store and statistics. Runs until interrupted.
    Work {
        /// Stable claim identity for this process
        ///
        /// Jobs abandoned by a crash are recovered at the next start under
        /// the same identity, so give each worker process a unique, stable
        /// id (for example the host name). Defaults to the host name.
        #[arg(long, value_name = "ID", value_parser = super::validation::validate_worker_id)]
        worker_id: Option<String>,

        /// Number of worker loops to run in this process
        ///
        /// Overrides `dispatch.worker_loops` from the configuration.
        #[arg(long, value_name = "N", value_parser = super::validation::validate_worker_loops)]
        loops: Option<usize>,

        /// Validate configuration and exit
        ///
        /// Performs a complete configuration validation check without
        /// touching the database or starting any loop.
        #[arg(long)]
        dry_run: bool,
    },
    /// Database migration operations
    ///
    /// Manage database schema migrations. This command connects to the
    /// configured database and applies or rolls back schema changes.
    Migrate {
        /// Show pending migrations without applying
        ///
        /// Cannot be used with --rollback.
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of migrations to rollback
        ///
        /// Reverts the specified number of most recent migrations.
        /// Use with caution as this can result in data loss.
        /// Must be between 1 and 100 for safety reasons.
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
    /// Campaign operations (the triggering surface)
    #[command(subcommand)]
    Campaign(CampaignCommands),
}

/// Campaign subcommands
#[derive(Subcommand, Debug)]
pub enum CampaignCommands {
    /// Create dispatch jobs for a campaign
    ///
    /// Splits the aggregate rate into per-job slices capped at
    /// `dispatch.max_job_rate`, one Ready job each.
    Launch {
        /// Campaign id
        #[arg(long)]
        id: i64,

        /// Aggregate send rate in messages/minute
        ///
        /// Defaults to the campaign's own target rate.
        #[arg(long, value_name = "RATE", value_parser = super::validation::validate_send_rate)]
        rate: Option<i32>,
    },
    /// Stop a campaign: halt it and stop all of its non-archived jobs
    Stop {
        /// Campaign id
        #[arg(long)]
        id: i64,
    },
    /// Re-arm a fully archived campaign for another dispatch cycle
    ///
    /// A silent no-op while any of the campaign's jobs is still in flight.
    Retry {
        /// Campaign id
        #[arg(long)]
        id: i64,
    },
    /// Show a campaign's jobs and statistics
    Stats {
        /// Campaign id
        #[arg(long)]
        id: i64,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "production", alias = "prod")]
    Production,
    #[value(name = "test")]
    Test,
}

impl Cli {
    /// Validate CLI argument combinations beyond what clap enforces.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        if let Some(Commands::Migrate { dry_run, rollback }) = &self.command
            && *dry_run
            && rollback.is_some()
        {
            return Err("Cannot use --dry-run and --rollback together".to_string());
        }

        Ok(())
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Production => crate::config::Environment::Production,
            Environment::Test => crate::config::Environment::Test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let result = Cli::try_parse_from(["courier-rs", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["courier-rs"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
    }

    #[test]
    fn test_work_command() {
        let cli = Cli::try_parse_from([
            "courier-rs",
            "work",
            "--worker-id",
            "dispatch-a",
            "--loops",
            "4",
        ])
        .unwrap();
        if let Some(Commands::Work {
            worker_id,
            loops,
            dry_run,
        }) = cli.command
        {
            assert_eq!(worker_id.as_deref(), Some("dispatch-a"));
            assert_eq!(loops, Some(4));
            assert!(!dry_run);
        } else {
            panic!("Expected Work command");
        }
    }

    #[test]
    fn test_migrate_command() {
        let cli = Cli::try_parse_from(["courier-rs", "migrate", "--dry-run"]).unwrap();
        if let Some(Commands::Migrate { dry_run, rollback }) = cli.command {
            assert!(dry_run);
            assert!(rollback.is_none());
        } else {
            panic!("Expected Migrate command");
        }
    }

    #[test]
    fn test_campaign_launch_command() {
        let cli =
            Cli::try_parse_from(["courier-rs", "campaign", "launch", "--id", "42", "--rate", "1200"])
                .unwrap();
        if let Some(Commands::Campaign(CampaignCommands::Launch { id, rate })) = cli.command {
            assert_eq!(id, 42);
            assert_eq!(rate, Some(1200));
        } else {
            panic!("Expected Campaign Launch command");
        }
    }

    #[test]
    fn test_invalid_rate_is_rejected() {
        let result =
            Cli::try_parse_from(["courier-rs", "campaign", "launch", "--id", "42", "--rate", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let result = Cli::try_parse_from(["courier-rs", "--verbose", "--quiet"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_migrate_dry_run_conflicts_with_rollback() {
        let result =
            Cli::try_parse_from(["courier-rs", "migrate", "--dry-run", "--rollback", "2"]);
        assert!(result.is_err());
    }
}
