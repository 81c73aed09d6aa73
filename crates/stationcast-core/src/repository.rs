//! Store abstractions for participants, event state, and delivery outcomes.
//!
//! Implementations must make a write visible to the next read issued by the
//! same process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{Event, NewEvent};
use crate::outcome::DeliveryRecord;
use crate::participant::{NewParticipant, Participant};

/// Persistence for registered participants.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Registers a participant, or returns the existing one with the same
    /// recipient.
    ///
    /// The store enforces its participant limit atomically with the insert:
    /// returns `DomainError::StateConflict` once the limit is reached or the
    /// number is taken, and `DomainError::Validation` for a number outside
    /// `1..=limit`.
    async fn register(
        &self,
        participant: NewParticipant,
        registered_at: DateTime<Utc>,
    ) -> Result<Participant, DomainError>;

    /// Loads one participant.
    async fn get(&self, id: Uuid) -> Result<Participant, DomainError>;

    /// All participants, active or not, ordered by number.
    async fn list(&self) -> Result<Vec<Participant>, DomainError>;

    /// All active participants, ordered by number.
    async fn get_active(&self) -> Result<Vec<Participant>, DomainError>;

    /// Sets the participant's current station.
    async fn update_station(&self, id: Uuid, station: u32) -> Result<(), DomainError>;

    /// Activates or deactivates the participant.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), DomainError>;
}

/// Persistence for the singleton event run.
#[async_trait]
pub trait EventStateStore: Send + Sync {
    /// The active event, if any.
    async fn get_active(&self) -> Result<Option<Event>, DomainError>;

    /// Persists a new active event at station 0.
    ///
    /// Returns `DomainError::StateConflict` if another event is active.
    async fn create(&self, event: NewEvent, created_at: DateTime<Utc>)
    -> Result<Event, DomainError>;

    /// Records the last fired station.
    async fn update_station(&self, id: Uuid, station: u32) -> Result<(), DomainError>;

    /// Marks the event inactive.
    async fn deactivate(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<(), DomainError>;
}

/// Append-only log of delivery outcomes.
#[async_trait]
pub trait OutcomeLog: Send + Sync {
    /// Appends records.
    async fn record(&self, records: &[DeliveryRecord]) -> Result<(), DomainError>;

    /// All records of one event, ordered by station.
    async fn for_event(&self, event_id: Uuid) -> Result<Vec<DeliveryRecord>, DomainError>;
}
