//! Statistics repository for async database operations.
//!
//! One row per campaign, upserted atomically from recomputed counts.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Statistics, StatusCounts};
use crate::schema::statistics;

/// Statistics repository
#[derive(Clone)]
pub struct StatisticsRepository {
    pool: AsyncDbPool,
}

impl StatisticsRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Atomically inserts or replaces the campaign's statistics row.
    pub async fn upsert(&self, campaign_id: i64, counts: StatusCounts) -> AppResult<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        let now = Utc::now().naive_utc();

        diesel::insert_into(statistics::table)
            .values((
                statistics::campaign_id.eq(campaign_id),
                statistics::unsent.eq(counts.unsent),
                statistics::errored.eq(counts.errored),
                statistics::sent.eq(counts.sent),
                statistics::invalid.eq(counts.invalid),
                statistics::updated_at.eq(now),
            ))
            .on_conflict(statistics::campaign_id)
            .do_update()
            .set((
                statistics::unsent.eq(counts.unsent),
                statistics::errored.eq(counts.errored),
                statistics::sent.eq(counts.sent),
                statistics::invalid.eq(counts.invalid),
                statistics::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }

    pub async fn get(&self, campaign_id: i64) -> AppResult<Option<Statistics>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        statistics::table
            .find(campaign_id)
            .select(Statistics::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }
}
