//! Microsecond time sources for the pacing loop

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of wall-clock timestamps in microseconds
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        // Pre-epoch clocks read as 0
        u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or(0)
    }
}

/// Clock that only moves when told to
///
/// Clones share one time value, so a test transport holding a clone can
/// advance the time the scheduler sees.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now_us: Arc::new(AtomicU64::new(start_us)),
        }
    }

    pub fn advance(&self, delta_us: u64) {
        self.now_us.fetch_add(delta_us, Ordering::SeqCst);
    }

    /// Move forward to `target_us`; never moves backwards
    pub fn advance_to(&self, target_us: u64) {
        self.now_us.fetch_max(target_us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }
}
