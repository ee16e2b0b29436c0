//! The campaign dispatch pipeline: worker loops, reconciliation, recovery,
//! and rate pacing.
//!
//! Coordination across processes lives entirely in the repositories (the
//! claim protocol); this module contains the long-running loops that drive
//! it.

mod rate;
mod reconciler;
mod recovery;
mod runner;
mod worker;

pub use rate::SendPacer;
pub use reconciler::{Reconciler, is_settled};
pub use recovery::resume_abandoned_jobs;
pub use runner::{RunHandle, Runner};
pub use worker::Worker;
