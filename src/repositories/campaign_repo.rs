//! Campaign repository for async database operations.
//!
//! Campaigns are owned by the upstream management layer; the pipeline reads
//! them to learn the channel and rate of a job's campaign, and writes only
//! the halted flag.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Campaign, NewCampaign};
use crate::schema::campaigns;

/// Campaign repository
#[derive(Clone)]
pub struct CampaignRepository {
    pool: AsyncDbPool,
}

impl CampaignRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, campaign_id: i64) -> AppResult<Campaign> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        campaigns::table
            .find(campaign_id)
            .select(Campaign::as_select())
            .first(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::NotFound {
                    entity: "Campaign".to_string(),
                    field: "id".to_string(),
                    value: campaign_id.to_string(),
                },
                _ => AppError::from(e),
            })
    }

    /// Marks a campaign halted (or resumes it), preventing new working-set
    /// materialization for it.
    pub async fn set_halted(&self, campaign_id: i64, value: bool) -> AppResult<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::update(campaigns::table.find(campaign_id))
            .set((
                campaigns::halted.eq(value),
                campaigns::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }

    /// Insert path for embedding applications and tests; campaign rows are
    /// normally created by the upstream management layer.
    pub async fn create(&self, campaign: NewCampaign) -> AppResult<Campaign> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::insert_into(campaigns::table)
            .values(&campaign)
            .returning(Campaign::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
