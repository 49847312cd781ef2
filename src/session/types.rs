//! Session types

use serde::Serialize;

/// Counters accumulated over the life of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Enumeration round-trips
    pub round_trips: u64,
    /// Pages yielded by enumerations
    pub items: u64,
    /// Enumerations started
    pub enumerations: u64,
    /// Batch calls issued
    pub chunks: u64,
    /// Batch calls that failed as a whole
    pub failed_chunks: u64,
    /// Batch items that failed
    pub failures: u64,
    /// Redirect chains followed to their target
    pub redirects_resolved: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_round_trips(&mut self, count: u64) {
        self.round_trips += count;
    }

    pub fn add_item(&mut self) {
        self.items += 1;
    }

    pub fn add_enumeration(&mut self) {
        self.enumerations += 1;
    }

    /// Record the totals of one batch call
    pub fn add_batch(&mut self, chunks: usize, failed_chunks: usize, failures: usize) {
        self.chunks += chunks as u64;
        self.failed_chunks += failed_chunks as u64;
        self.failures += failures as u64;
    }

    pub fn add_redirect(&mut self) {
        self.redirects_resolved += 1;
    }
}
