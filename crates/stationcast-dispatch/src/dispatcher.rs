//! The batch dispatcher.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::join_all;
use stationcast_core::channel::{DeliveryChannel, DeliveryError};
use stationcast_core::outcome::{DeliveryStatus, ErrorClass};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::policy::DispatchConfig;

/// One message to deliver. `key` identifies the item to the caller.
#[derive(Debug, Clone)]
pub struct DispatchItem<K> {
    /// Caller-side identifier (a participant id for station firings).
    pub key: K,
    /// Channel address.
    pub recipient: String,
    /// Message body.
    pub message: String,
}

/// Final outcome of one dispatched item.
#[derive(Debug, Clone)]
pub struct ItemOutcome<K> {
    /// The item's key.
    pub key: K,
    /// Channel address.
    pub recipient: String,
    /// Final status.
    pub status: DeliveryStatus,
    /// Channel calls made for this item.
    pub attempts: u32,
    /// Class of the last failure, if any.
    pub last_error: Option<ErrorClass>,
}

/// Result of one dispatch: one outcome per input item, in input order.
#[derive(Debug, Clone)]
pub struct DispatchReport<K> {
    /// Per-item outcomes.
    pub outcomes: Vec<ItemOutcome<K>>,
    /// Chunks sent.
    pub chunks: usize,
    /// Channel calls made.
    pub calls: usize,
}

impl<K> DispatchReport<K> {
    /// Number of outcomes with `status`.
    #[must_use]
    pub fn count(&self, status: DeliveryStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Number of items that failed for good.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(DeliveryStatus::RetriedThenFailed) + self.count(DeliveryStatus::PermanentlyFailed)
    }
}

struct Pending<K> {
    index: usize,
    item: DispatchItem<K>,
    attempts: u32,
    last_error: Option<ErrorClass>,
    ready_at: Instant,
}

impl<K> Pending<K> {
    fn finish(self, status: DeliveryStatus) -> (usize, ItemOutcome<K>) {
        (
            self.index,
            ItemOutcome {
                key: self.item.key,
                recipient: self.item.recipient,
                status,
                attempts: self.attempts,
                last_error: self.last_error,
            },
        )
    }
}

/// Sends messages in paced chunks through a [`DeliveryChannel`].
#[derive(Clone)]
pub struct BatchDispatcher {
    channel: Arc<dyn DeliveryChannel>,
    config: DispatchConfig,
}

impl std::fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BatchDispatcher {
    /// Creates a dispatcher over `channel`.
    #[must_use]
    pub fn new(channel: Arc<dyn DeliveryChannel>, config: DispatchConfig) -> Self {
        Self { channel, config }
    }

    /// The dispatcher's configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Delivers `items` and reports one outcome per item.
    ///
    /// Items go out in chunks of `batch_size`, each chunk sent concurrently
    /// and awaited as a whole, with `inter_batch_delay` between chunks and no
    /// pause after the last one. Transiently failed items wait out their
    /// retry delay and join a later chunk ahead of fresh items, so no chunk
    /// ever exceeds `batch_size` calls. Cancellation is honored only between
    /// chunks; items not yet sent are reported `Aborted`.
    pub async fn dispatch<K>(
        &self,
        items: Vec<DispatchItem<K>>,
        cancel: &CancellationToken,
    ) -> DispatchReport<K>
    where
        K: Send + Sync,
    {
        let total = items.len();
        let chunk_size = self.config.chunk_size();
        let started = Instant::now();
        let mut fresh: VecDeque<Pending<K>> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Pending {
                index,
                item,
                attempts: 0,
                last_error: None,
                ready_at: started,
            })
            .collect();
        let mut retries: Vec<Pending<K>> = Vec::new();
        let mut finished: Vec<(usize, ItemOutcome<K>)> = Vec::with_capacity(total);
        let mut chunks = 0usize;
        let mut calls = 0usize;

        while !fresh.is_empty() || !retries.is_empty() {
            if chunks > 0 {
                let mut resume_at = Instant::now() + self.config.inter_batch_delay;
                if fresh.is_empty()
                    && let Some(earliest) = retries.iter().map(|p| p.ready_at).min()
                {
                    resume_at = resume_at.max(earliest);
                }
                if !sleep_until_or_cancel(resume_at, cancel).await {
                    warn!(
                        remaining = fresh.len() + retries.len(),
                        "dispatch cancelled between chunks"
                    );
                    break;
                }
            } else if cancel.is_cancelled() {
                break;
            }

            let now = Instant::now();
            let mut chunk: Vec<Pending<K>> = Vec::with_capacity(chunk_size);
            let mut idx = 0;
            while idx < retries.len() && chunk.len() < chunk_size {
                if retries[idx].ready_at <= now {
                    chunk.push(retries.remove(idx));
                } else {
                    idx += 1;
                }
            }
            while chunk.len() < chunk_size {
                match fresh.pop_front() {
                    Some(pending) => chunk.push(pending),
                    None => break,
                }
            }
            if chunk.is_empty() {
                continue;
            }

            chunks += 1;
            calls += chunk.len();
            debug!(chunk = chunks, size = chunk.len(), "sending chunk");

            let results = join_all(
                chunk
                    .iter()
                    .map(|p| self.channel.send(&p.item.recipient, &p.item.message)),
            )
            .await;

            for (mut pending, result) in chunk.into_iter().zip(results) {
                pending.attempts += 1;
                match result {
                    Ok(()) => finished.push(pending.finish(DeliveryStatus::Delivered)),
                    Err(DeliveryError::Permanent { class }) => {
                        warn!(recipient = %pending.item.recipient, %class, "permanent delivery failure");
                        pending.last_error = Some(class);
                        finished.push(pending.finish(DeliveryStatus::PermanentlyFailed));
                    }
                    Err(DeliveryError::Transient { class, retry_after }) => {
                        pending.last_error = Some(class);
                        if self.config.retry.allows_retry(pending.attempts) {
                            let mut delay = self.config.retry.delay_for(pending.attempts);
                            if let Some(hint) = retry_after {
                                delay = delay.max(hint);
                            }
                            debug!(
                                recipient = %pending.item.recipient,
                                %class,
                                attempts = pending.attempts,
                                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                                "transient delivery failure, retrying"
                            );
                            pending.ready_at = Instant::now() + delay;
                            retries.push(pending);
                        } else {
                            warn!(
                                recipient = %pending.item.recipient,
                                %class,
                                attempts = pending.attempts,
                                "retries exhausted"
                            );
                            finished.push(pending.finish(DeliveryStatus::RetriedThenFailed));
                        }
                    }
                }
            }
        }

        finished.extend(
            retries
                .into_iter()
                .chain(fresh)
                .map(|pending| pending.finish(DeliveryStatus::Aborted)),
        );
        finished.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<ItemOutcome<K>> = finished.into_iter().map(|(_, o)| o).collect();

        let report = DispatchReport {
            outcomes,
            chunks,
            calls,
        };
        info!(
            items = total,
            chunks,
            calls,
            delivered = report.count(DeliveryStatus::Delivered),
            failed = report.failed(),
            aborted = report.count(DeliveryStatus::Aborted),
            "dispatch finished"
        );
        report
    }
}

/// Sleeps until `deadline`; returns `false` if cancelled first.
async fn sleep_until_or_cancel(deadline: Instant, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep_until(deadline) => true,
    }
}
