//! Environment abstraction: time supplied explicitly.
//!
//! Engine code never reaches for ambient clocks. Production uses
//! [`SystemEnv`]; the harness substitutes a virtual clock so tests are
//! deterministic and instantaneous.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the engine.
///
/// `now` feeds cache-freshness decisions and `unix_millis` stamps
/// `created_at`/`updated_at` on canonical records.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Current wall-clock time as unix milliseconds.
    fn unix_millis(&self) -> u64;
}

/// Production environment backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_millis(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}
