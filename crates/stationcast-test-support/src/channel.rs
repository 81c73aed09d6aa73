//! Scripted delivery channel that records every call.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use stationcast_core::channel::{DeliveryChannel, DeliveryError};
use tokio::time::Instant;

/// One call made to a [`RecordingChannel`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Address the message was sent to.
    pub recipient: String,
    /// Message body.
    pub message: String,
    /// Tokio instant at which the call started.
    pub at: Instant,
}

/// A delivery channel that records every call.
///
/// Succeeds unless told otherwise. Per-recipient scripts are consumed one
/// response per call, after which the channel falls back to the
/// recipient's permanent response (if any) and finally to success.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<SentMessage>>,
    scripts: Mutex<HashMap<String, VecDeque<Result<(), DeliveryError>>>>,
    always: HashMap<String, DeliveryError>,
    latency: Option<Duration>,
}

impl RecordingChannel {
    /// A channel on which every send succeeds instantly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues scripted responses for `recipient`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn script(self, recipient: &str, responses: Vec<Result<(), DeliveryError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(recipient.to_owned(), responses.into());
        self
    }

    /// Makes every send to `recipient` fail with `error`.
    #[must_use]
    pub fn fail_always(mut self, recipient: &str, error: DeliveryError) -> Self {
        self.always.insert(recipient.to_owned(), error);
        self
    }

    /// Makes every send take `latency` of tokio time.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns a snapshot of all calls, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of calls made to `recipient`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls_to(&self, recipient: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.recipient == recipient)
            .count()
    }

    /// Messages received by `recipient`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages_to(&self, recipient: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.recipient == recipient)
            .map(|s| s.message.clone())
            .collect()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_owned(),
            message: message.to_owned(),
            at: Instant::now(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(recipient)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(response) => response,
            None => self.always.get(recipient).map_or(Ok(()), |e| Err(e.clone())),
        }
    }
}
