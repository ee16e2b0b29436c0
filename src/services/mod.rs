//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between
//! repositories and the dispatch loops.

mod campaign_service;
pub mod channels;

pub use campaign_service::{CampaignService, split_rate};
pub use channels::{ChannelSenders, MessageSender, SendError, SendOutcome};

use crate::repositories::Repositories;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap since underlying pools use `Arc` internally.
#[derive(Clone)]
pub struct Services {
    pub campaigns: CampaignService,
}

impl Services {
    /// Creates a new Services instance from Repositories.
    pub fn new(repos: Repositories, max_job_rate: i32) -> Self {
        Self {
            campaigns: CampaignService::new(repos, max_job_rate),
        }
    }
}
