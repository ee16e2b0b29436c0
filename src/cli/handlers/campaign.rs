//! Campaign command handler
//!
//! Thin CLI wrappers over the campaign service: launch, stop, retry, stats.

use crate::cli::parser::CampaignCommands;
use crate::config::settings::Settings;
use crate::db::establish_pool;
use crate::error::AppResult;
use crate::repositories::Repositories;
use crate::services::Services;

/// Handler for campaign subcommands
pub struct CampaignCommandHandler {
    config: Settings,
}

impl CampaignCommandHandler {
    /// Create a new campaign command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(&self, command: &CampaignCommands) -> AppResult<()> {
        self.config.database.validate()?;

        let pool = establish_pool(&self.config.database).await?;
        let repos = Repositories::new(pool);
        let services = Services::new(repos, self.config.dispatch.max_job_rate);

        match command {
            CampaignCommands::Launch { id, rate } => {
                let jobs = services.campaigns.launch(*id, *rate).await?;
                println!("✓ Created {} dispatch job(s) for campaign {}:", jobs.len(), id);
                for job in jobs {
                    println!("  - job {} at {} msg/min", job.id, job.send_rate);
                }
            }
            CampaignCommands::Stop { id } => {
                let stopped = services.campaigns.stop(*id).await?;
                println!("✓ Campaign {} halted; {} job(s) stopped", id, stopped);
            }
            CampaignCommands::Retry { id } => {
                if services.campaigns.retry(*id).await? {
                    println!("✓ Campaign {} re-armed for retry", id);
                } else {
                    println!(
                        "Campaign {} has jobs still in flight; retry ignored",
                        id
                    );
                }
            }
            CampaignCommands::Stats { id } => {
                match services.campaigns.statistics(*id).await? {
                    Some(stats) => {
                        println!("Campaign {} statistics:", id);
                        println!("  unsent:  {}", stats.unsent);
                        println!("  errored: {}", stats.errored);
                        println!("  sent:    {}", stats.sent);
                        println!("  invalid: {}", stats.invalid);
                        println!("  updated: {}", stats.updated_at);
                    }
                    None => println!("No statistics for campaign {} yet", id),
                }

                let jobs = services.campaigns.jobs(*id).await?;
                if jobs.is_empty() {
                    println!("No jobs for campaign {}", id);
                } else {
                    println!("Jobs:");
                    for job in jobs {
                        println!(
                            "  - job {} [{}] {} msg/min worker={}",
                            job.id,
                            job.status,
                            job.send_rate,
                            job.worker_id.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_campaign_handler_requires_database_url() {
        let handler = CampaignCommandHandler::new(Settings::default());
        let result = handler
            .execute(&CampaignCommands::Stop { id: 1 })
            .await;
        assert!(result.is_err());
    }
}
