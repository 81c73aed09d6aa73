//! Outbound delivery channel abstraction.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::outcome::ErrorClass;

/// Failure reported by a delivery channel for a single message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Worth retrying later (rate limit, timeout, network blip).
    #[error("transient delivery failure: {class}")]
    Transient {
        /// Failure class.
        class: ErrorClass,
        /// Minimum wait the channel asked for before the next attempt.
        retry_after: Option<Duration>,
    },

    /// Retrying will not help (blocked or unknown recipient).
    #[error("permanent delivery failure: {class}")]
    Permanent {
        /// Failure class.
        class: ErrorClass,
    },
}

impl DeliveryError {
    /// Transient failure without a retry hint.
    #[must_use]
    pub fn transient(class: ErrorClass) -> Self {
        Self::Transient {
            class,
            retry_after: None,
        }
    }

    /// Permanent failure.
    #[must_use]
    pub fn permanent(class: ErrorClass) -> Self {
        Self::Permanent { class }
    }

    /// The failure class.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transient { class, .. } | Self::Permanent { class } => *class,
        }
    }

    /// Whether the failure may be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// A third-party messaging channel that accepts one message per call.
///
/// Implementations may enforce their own rate limits; callers must not
/// assume a call completes instantly.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Sends `message` to `recipient`.
    async fn send(&self, recipient: &str, message: &str) -> Result<(), DeliveryError>;
}
