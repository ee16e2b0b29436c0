//! Send-rate pacing for a claimed job.
//!
//! A job's `send_rate` is a messages/minute budget. The worker drains the
//! working set in batches; after dispatching a batch it sleeps off the
//! remainder of that batch's share of the minute, so the average dispatch
//! rate approximates the budget regardless of batch size or provider
//! latency.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct SendPacer {
    rate_per_minute: u32,
}

impl SendPacer {
    pub fn new(rate_per_minute: i32) -> Self {
        Self {
            rate_per_minute: rate_per_minute.max(1) as u32,
        }
    }

    /// How many rows to claim per batch, bounded by the configured batch
    /// size. A slow job never claims more than one minute's budget at once,
    /// so a stop takes effect within a batch.
    pub fn batch_limit(&self, configured: i64) -> i64 {
        configured.min(self.rate_per_minute as i64).max(1)
    }

    /// The time slice a batch of this size is allowed to occupy. The worker
    /// subtracts the time the provider calls actually took and sleeps the
    /// rest.
    pub fn batch_window(&self, batch_len: usize) -> Duration {
        let millis = (batch_len as u64).saturating_mul(60_000) / self.rate_per_minute as u64;
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_scales_with_batch_size_and_rate() {
        // 60/min -> one message per second.
        assert_eq!(SendPacer::new(60).batch_window(10), Duration::from_secs(10));
        // 600/min -> ten per second.
        assert_eq!(SendPacer::new(600).batch_window(50), Duration::from_secs(5));
        assert_eq!(SendPacer::new(600).batch_window(0), Duration::ZERO);
    }

    #[test]
    fn batch_limit_never_exceeds_the_minute_budget() {
        assert_eq!(SendPacer::new(10).batch_limit(50), 10);
        assert_eq!(SendPacer::new(600).batch_limit(50), 50);
        // Degenerate rates still make progress.
        assert_eq!(SendPacer::new(0).batch_limit(50), 1);
    }

    #[test]
    fn full_minute_budget_occupies_a_minute() {
        let pacer = SendPacer::new(120);
        assert_eq!(pacer.batch_window(120), Duration::from_secs(60));
    }
}
