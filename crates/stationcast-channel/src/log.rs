//! A channel that only logs. Used when no bot token is configured.

use async_trait::async_trait;
use stationcast_core::channel::{DeliveryChannel, DeliveryError};
use tracing::info;

/// Delivery channel that writes each message to the log and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl DeliveryChannel for LogChannel {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        info!(recipient, chars = message.chars().count(), "message (log channel)");
        Ok(())
    }
}
