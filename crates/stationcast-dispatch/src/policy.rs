//! Retry and batching policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded retry policy for transient delivery failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Minimum wait before the first retry.
    pub base_delay: Duration,
    /// Growth factor per further retry (1 = fixed delay).
    pub multiplier: u32,
    /// Upper bound for any single retry delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// No retries at all.
    #[must_use]
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// The same delay before every retry.
    #[must_use]
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay: delay,
            multiplier: 1,
            max_delay: delay,
        }
    }

    /// Delay doubling on every retry, capped at `max_delay`.
    #[must_use]
    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            multiplier: 2,
            max_delay,
        }
    }

    /// Calls allowed per item, first attempt included.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether an item that has made `attempts` calls may be tried again.
    #[must_use]
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts()
    }

    /// Minimum wait before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

/// Chunking and pacing for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Items sent per chunk; keep it below the channel's per-second cap.
    pub batch_size: usize,
    /// Pause between consecutive chunks.
    pub inter_batch_delay: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl DispatchConfig {
    /// Effective chunk size (never 0).
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            inter_batch_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}
