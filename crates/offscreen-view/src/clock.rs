//! Monotonic time sources for input replay.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Source of monotonic milliseconds, analogous to a platform uptime clock.
pub trait Clock: Send + Sync {
    fn uptime_millis(&self) -> u64;
}

/// Milliseconds since the first use of the clock in this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn uptime_millis(&self) -> u64 {
        PROCESS_START.elapsed().as_millis() as u64
    }
}

/// Manually driven clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn uptime_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
