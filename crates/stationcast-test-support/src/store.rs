//! Stores that fail on demand. Useful for testing error-handling paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stationcast_core::error::DomainError;
use stationcast_core::event::{Event, NewEvent};
use stationcast_core::outcome::DeliveryRecord;
use stationcast_core::participant::{NewParticipant, Participant};
use stationcast_core::repository::{EventStateStore, OutcomeLog, ParticipantStore};
use uuid::Uuid;

fn unavailable() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// A participant store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingParticipantStore;

#[async_trait]
impl ParticipantStore for FailingParticipantStore {
    async fn register(
        &self,
        _participant: NewParticipant,
        _registered_at: DateTime<Utc>,
    ) -> Result<Participant, DomainError> {
        Err(unavailable())
    }

    async fn get(&self, _id: Uuid) -> Result<Participant, DomainError> {
        Err(unavailable())
    }

    async fn list(&self) -> Result<Vec<Participant>, DomainError> {
        Err(unavailable())
    }

    async fn get_active(&self) -> Result<Vec<Participant>, DomainError> {
        Err(unavailable())
    }

    async fn update_station(&self, _id: Uuid, _station: u32) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn set_active(&self, _id: Uuid, _active: bool) -> Result<(), DomainError> {
        Err(unavailable())
    }
}

/// An event store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStateStore for FailingEventStore {
    async fn get_active(&self) -> Result<Option<Event>, DomainError> {
        Err(unavailable())
    }

    async fn create(
        &self,
        _event: NewEvent,
        _created_at: DateTime<Utc>,
    ) -> Result<Event, DomainError> {
        Err(unavailable())
    }

    async fn update_station(&self, _id: Uuid, _station: u32) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn deactivate(&self, _id: Uuid, _ended_at: DateTime<Utc>) -> Result<(), DomainError> {
        Err(unavailable())
    }
}

/// Wraps an event store and fails its next `update_station` calls.
pub struct FlakyEventStore {
    inner: Arc<dyn EventStateStore>,
    station_failures: AtomicU32,
}

impl FlakyEventStore {
    /// Wraps `inner`; the first `failures` calls to `update_station` fail.
    #[must_use]
    pub fn new(inner: Arc<dyn EventStateStore>, failures: u32) -> Self {
        Self {
            inner,
            station_failures: AtomicU32::new(failures),
        }
    }
}

impl std::fmt::Debug for FlakyEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakyEventStore")
            .field("station_failures", &self.station_failures)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStateStore for FlakyEventStore {
    async fn get_active(&self) -> Result<Option<Event>, DomainError> {
        self.inner.get_active().await
    }

    async fn create(&self, event: NewEvent, created_at: DateTime<Utc>) -> Result<Event, DomainError> {
        self.inner.create(event, created_at).await
    }

    async fn update_station(&self, id: Uuid, station: u32) -> Result<(), DomainError> {
        let fail = self
            .station_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if fail {
            return Err(unavailable());
        }
        self.inner.update_station(id, station).await
    }

    async fn deactivate(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<(), DomainError> {
        self.inner.deactivate(id, ended_at).await
    }
}

/// An outcome log that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingOutcomeLog;

#[async_trait]
impl OutcomeLog for FailingOutcomeLog {
    async fn record(&self, _records: &[DeliveryRecord]) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn for_event(&self, _event_id: Uuid) -> Result<Vec<DeliveryRecord>, DomainError> {
        Err(unavailable())
    }
}
