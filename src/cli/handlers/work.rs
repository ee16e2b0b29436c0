//! Work command handler
//!
//! Runs the dispatch worker loops and the reconciler until interrupted.

use tracing::info;

use crate::config::settings::Settings;
use crate::db::establish_pool;
use crate::dispatch::{Runner, resume_abandoned_jobs};
use crate::error::{AppError, AppResult};
use crate::state::WorkerContext;

/// Handler for the work command
pub struct WorkCommandHandler {
    config: Settings,
}

impl WorkCommandHandler {
    /// Create a new work command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the work command.
    ///
    /// # Arguments
    /// * `worker_id` - Stable claim identity; defaults to the host name
    /// * `loops` - Worker loop count override
    /// * `dry_run` - Validate configuration and exit
    pub async fn execute(
        &self,
        worker_id: Option<String>,
        loops: Option<usize>,
        dry_run: bool,
    ) -> AppResult<()> {
        let mut config = self.config.clone();
        if let Some(loops) = loops {
            config.dispatch.worker_loops = loops;
        }
        config.validate()?;

        if dry_run {
            println!("✓ Configuration is valid");
            println!("✓ Database URL is configured");
            println!(
                "✓ {} worker loop(s), batch size {}, settle after {}s",
                config.dispatch.worker_loops,
                config.dispatch.batch_size,
                config.dispatch.settle_after_secs
            );
            println!("Dry run completed successfully");
            return Ok(());
        }

        let worker_id = worker_id.unwrap_or_else(default_worker_id);

        let pool = establish_pool(&config.database).await?;
        if config.database.auto_migrate {
            run_pending_migrations(&config.database.url).await?;
        }

        let context = WorkerContext::new(pool, config, worker_id);
        if context.senders.is_empty() {
            return Err(AppError::Validation {
                field: "channels".to_string(),
                reason: "No channel providers configured; nothing to dispatch with".to_string(),
            });
        }

        info!(
            worker = %context.worker_id,
            channels = ?context
                .senders
                .configured()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>(),
            "Starting dispatch process"
        );

        // Reclaim anything a crashed predecessor under this identity left
        // owned, then start the loops.
        resume_abandoned_jobs(&context.repos, &context.worker_id).await?;

        let runner = Runner::new(context.clone());
        let handle = runner.start();

        tokio::signal::ctrl_c().await.map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;
        info!("Shutdown signal received; draining loops…");
        handle.shutdown();
        handle.wait_for_shutdown().await;

        // Orderly shutdown releases any job a loop was still draining, so
        // another process can claim it immediately instead of waiting for a
        // crash-recovery restart.
        resume_abandoned_jobs(&context.repos, &context.worker_id).await?;
        info!("Dispatch process stopped");

        Ok(())
    }
}

fn default_worker_id() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "courier".to_string())
}

async fn run_pending_migrations(database_url: &str) -> AppResult<()> {
    let database_url = database_url.to_string();
    let applied: Vec<String> = tokio::task::spawn_blocking(move || {
        use diesel::Connection;
        use diesel::pg::PgConnection;
        use diesel_migrations::MigrationHarness;

        let mut conn =
            PgConnection::establish(&database_url).map_err(|e| AppError::Database {
                operation: "establish connection for migrations".to_string(),
                source: anyhow::anyhow!("Connection error: {}", e),
            })?;

        let applied = conn
            .run_pending_migrations(crate::db::MIGRATIONS)
            .map_err(|e| AppError::Database {
                operation: "run pending migrations".to_string(),
                source: anyhow::anyhow!("Migration error: {}", e),
            })?;

        Ok::<_, AppError>(applied.iter().map(|m| m.to_string()).collect())
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })??;

    if !applied.is_empty() {
        info!(count = applied.len(), "Applied pending migrations");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/test".to_string();
        config
    }

    #[tokio::test]
    async fn test_work_handler_dry_run() {
        let handler = WorkCommandHandler::new(create_valid_config());
        let result = handler.execute(None, Some(2), true).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_work_handler_dry_run_invalid_config() {
        let mut config = create_valid_config();
        config.dispatch.batch_size = 0;
        let handler = WorkCommandHandler::new(config);

        let result = handler.execute(None, None, true).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_default_worker_id_is_never_empty() {
        assert!(!default_worker_id().is_empty());
    }
}
