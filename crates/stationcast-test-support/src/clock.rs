//! Test clocks: deterministic `Clock` implementations for tests.

use chrono::{DateTime, TimeDelta, Utc};
use stationcast_core::clock::Clock;
use tokio::time::Instant;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A wall clock driven by tokio's timer.
///
/// Reports `base` plus the tokio time elapsed since construction, so that
/// tests running under `#[tokio::test(start_paused = true)]` see wall time
/// advance exactly as far as the paused runtime auto-advances.
#[derive(Debug, Clone, Copy)]
pub struct PausedClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl PausedClock {
    /// Anchors the clock at `base`, as of the current tokio instant.
    #[must_use]
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().duration_since(self.origin);
        self.base + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::MAX)
    }
}
