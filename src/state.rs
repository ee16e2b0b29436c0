//! Process-wide context for the dispatch loops.
//!
//! Built once at startup and passed explicitly into workers, the reconciler,
//! and the CLI handlers; there is no global mutable client state.

use std::sync::Arc;

use crate::config::Settings;
use crate::db::AsyncDbPool;
use crate::repositories::Repositories;
use crate::services::channels::ChannelSenders;
use crate::services::Services;

/// Everything a dispatch process needs: settings, storage access, and the
/// channel senders it is able to dispatch with.
///
/// Cloning is cheap; the pool and senders use `Arc` internally.
#[derive(Clone)]
pub struct WorkerContext {
    pub settings: Arc<Settings>,
    pub repos: Repositories,
    pub services: Services,
    pub senders: ChannelSenders,
    /// Base claim identity of this process; worker loops claim as
    /// `{worker_id}-{n}`.
    pub worker_id: String,
}

impl WorkerContext {
    /// Creates the context from a connection pool and settings.
    ///
    /// One shared HTTP client backs every channel sender (connection
    /// pooling); senders exist only for configured channels.
    pub fn new(pool: AsyncDbPool, settings: Settings, worker_id: String) -> Self {
        let repos = Repositories::new(pool);
        let services = Services::new(repos.clone(), settings.dispatch.max_job_rate);
        let senders = ChannelSenders::from_config(&settings.channels, reqwest::Client::new());

        Self {
            settings: Arc::new(settings),
            repos,
            services,
            senders,
            worker_id,
        }
    }

    /// Claim identity for one worker loop of this process.
    pub fn loop_worker_id(&self, index: usize) -> String {
        format!("{}-{}", self.worker_id, index)
    }
}
