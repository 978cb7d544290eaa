//! Probe correlation and RTT aggregation

pub mod correlation;

pub use correlation::{CorrelationError, CorrelationStore};

use crate::models::RunSnapshot;
use serde::{Deserialize, Serialize};

/// Raw aggregate counters for one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub sent_count: u64,
    pub received_count: u64,
    pub rtt_sum_us: u64,
}

/// Accumulates send/match events into [`RunStats`]
///
/// Inputs are already-validated events from the scheduler, so nothing here
/// can fail.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    stats: RunStats,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successfully sent probe
    pub fn on_send(&mut self) {
        self.stats.sent_count += 1;
    }

    /// Count one matched response and its RTT
    pub fn on_match(&mut self, rtt_us: u64) {
        self.stats.received_count += 1;
        self.stats.rtt_sum_us = self.stats.rtt_sum_us.saturating_add(rtt_us);
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let mean_rtt_us = if self.stats.received_count > 0 {
            Some(self.stats.rtt_sum_us / self.stats.received_count)
        } else {
            None
        };

        RunSnapshot {
            sent_count: self.stats.sent_count,
            received_count: self.stats.received_count,
            mean_rtt_us,
        }
    }

    /// Raw counters, including the RTT sum
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn reset(&mut self) {
        self.stats = RunStats::default();
    }
}
