//! Repository layer for data access operations.
//!
//! Provides async operations over the job queue, the per-channel message
//! stores, campaigns, and statistics. All cross-process coordination lives
//! here, built on conditional updates and lock-skipping claim reads.

mod campaign_repo;
mod job_queue_repo;
mod message_store;
mod statistics_repo;

pub use campaign_repo::CampaignRepository;
pub use job_queue_repo::JobQueueRepository;
pub use message_store::{
    DISPATCH_TIMEOUT_CODE, MessageStore, RecipientSeed, WorkingSetState,
};
pub use statistics_repo::StatisticsRepository;

use crate::db::AsyncDbPool;

/// Aggregates all repositories for convenient access.
///
/// Since `AsyncDbPool` uses `Arc` internally, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub campaigns: CampaignRepository,
    pub jobs: JobQueueRepository,
    pub messages: MessageStore,
    pub statistics: StatisticsRepository,
}

impl Repositories {
    /// Creates a new Repositories instance with all repositories initialized.
    ///
    /// # Arguments
    /// * `pool` - The async database connection pool
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            jobs: JobQueueRepository::new(pool.clone()),
            messages: MessageStore::new(pool.clone()),
            statistics: StatisticsRepository::new(pool),
        }
    }
}
