//! Virtual-time environment.
//!
//! Tests advance the clock explicitly, so cache-staleness and
//! timestamp behavior is deterministic and instantaneous.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use haven_core::env::Environment;

/// Fixed wall-clock origin for simulated timestamps.
const SIM_EPOCH_MILLIS: u64 = 1_700_000_000_000;

#[derive(Debug)]
struct Clock {
    base: Instant,
    offset_millis: AtomicU64,
}

/// Environment with a manually advanced clock.
#[derive(Debug, Clone)]
pub struct SimEnv {
    clock: Arc<Clock>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Create an environment at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self { clock: Arc::new(Clock { base: Instant::now(), offset_millis: AtomicU64::new(0) }) }
    }

    /// Advance the virtual clock.
    pub fn advance(&self, duration: Duration) {
        self.clock.offset_millis.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Milliseconds elapsed since the environment was created.
    #[must_use]
    pub fn elapsed_millis(&self) -> u64 {
        self.clock.offset_millis.load(Ordering::SeqCst)
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        self.clock.base + Duration::from_millis(self.elapsed_millis())
    }

    fn unix_millis(&self) -> u64 {
        SIM_EPOCH_MILLIS + self.elapsed_millis()
    }
}
