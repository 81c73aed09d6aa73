//! In-memory stores.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stationcast_core::error::DomainError;
use stationcast_core::event::{Event, NewEvent};
use stationcast_core::outcome::DeliveryRecord;
use stationcast_core::participant::{NewParticipant, Participant};
use stationcast_core::repository::{EventStateStore, OutcomeLog, ParticipantStore};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Infrastructure("in-memory store lock poisoned".into()))
}

/// The smallest positive number not in `taken`.
pub(crate) fn first_free_number(taken: impl IntoIterator<Item = u32>) -> u32 {
    let taken: BTreeSet<u32> = taken.into_iter().collect();
    (1..).find(|n| !taken.contains(n)).unwrap_or(u32::MAX)
}

pub(crate) fn validate_requested_number(
    number: Option<u32>,
    limit: Option<u32>,
) -> Result<(), DomainError> {
    match (number, limit) {
        (Some(0), _) => Err(DomainError::Validation(
            "participant number must be positive".into(),
        )),
        (Some(number), Some(max)) if number > max => Err(DomainError::Validation(format!(
            "participant number {number} is outside 1..={max}"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_capacity(registered: usize, limit: Option<u32>) -> Result<(), DomainError> {
    match limit {
        Some(max) if registered >= usize::try_from(max).unwrap_or(usize::MAX) => Err(
            DomainError::StateConflict(format!("participant limit of {max} reached")),
        ),
        _ => Ok(()),
    }
}

/// Participant store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryParticipantStore {
    participants: Mutex<Vec<Participant>>,
    limit: Option<u32>,
}

impl InMemoryParticipantStore {
    /// Creates an empty store without a participant limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that accepts at most `max` participants.
    #[must_use]
    pub fn with_limit(max: u32) -> Self {
        Self {
            participants: Mutex::default(),
            limit: Some(max),
        }
    }
}

#[async_trait]
impl ParticipantStore for InMemoryParticipantStore {
    async fn register(
        &self,
        participant: NewParticipant,
        registered_at: DateTime<Utc>,
    ) -> Result<Participant, DomainError> {
        validate_requested_number(participant.number, self.limit)?;
        let mut participants = lock(&self.participants)?;
        if let Some(existing) = participants
            .iter()
            .find(|p| p.recipient == participant.recipient)
        {
            return Ok(existing.clone());
        }
        check_capacity(participants.len(), self.limit)?;
        let number = match participant.number {
            Some(number) => {
                if participants.iter().any(|p| p.number == number) {
                    return Err(DomainError::StateConflict(format!(
                        "participant number {number} is already taken"
                    )));
                }
                number
            }
            None => first_free_number(participants.iter().map(|p| p.number)),
        };
        let registered = Participant {
            id: Uuid::new_v4(),
            number,
            recipient: participant.recipient,
            display_name: participant.display_name,
            current_station: 0,
            active: true,
            registered_at,
        };
        participants.push(registered.clone());
        Ok(registered)
    }

    async fn get(&self, id: Uuid) -> Result<Participant, DomainError> {
        lock(&self.participants)?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| DomainError::participant_not_found(id))
    }

    async fn list(&self) -> Result<Vec<Participant>, DomainError> {
        let mut all = lock(&self.participants)?.clone();
        all.sort_by_key(|p| p.number);
        Ok(all)
    }

    async fn get_active(&self) -> Result<Vec<Participant>, DomainError> {
        let mut active: Vec<Participant> = lock(&self.participants)?
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect();
        active.sort_by_key(|p| p.number);
        Ok(active)
    }

    async fn update_station(&self, id: Uuid, station: u32) -> Result<(), DomainError> {
        let mut participants = lock(&self.participants)?;
        let participant = participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::participant_not_found(id))?;
        participant.current_station = participant.current_station.max(station);
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), DomainError> {
        let mut participants = lock(&self.participants)?;
        let participant = participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::participant_not_found(id))?;
        participant.active = active;
        Ok(())
    }
}

/// Event store held in process memory. Keeps ended events for inspection.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `event`, as if left behind by a previous
    /// process.
    #[must_use]
    pub fn with_event(event: Event) -> Self {
        Self {
            events: Mutex::new(vec![event]),
        }
    }

    /// Loads any event, active or not.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no event has `id`.
    pub fn get(&self, id: Uuid) -> Result<Event, DomainError> {
        lock(&self.events)?
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| DomainError::event_not_found(id))
    }
}

#[async_trait]
impl EventStateStore for InMemoryEventStore {
    async fn get_active(&self) -> Result<Option<Event>, DomainError> {
        Ok(lock(&self.events)?.iter().find(|e| e.active).cloned())
    }

    async fn create(&self, event: NewEvent, created_at: DateTime<Utc>) -> Result<Event, DomainError> {
        let mut events = lock(&self.events)?;
        if let Some(active) = events.iter().find(|e| e.active) {
            return Err(DomainError::StateConflict(format!(
                "event {} is already running",
                active.id
            )));
        }
        let created = Event {
            id: Uuid::new_v4(),
            start_time: event.start_time,
            total_stations: event.total_stations,
            station_duration_secs: event.station_duration_secs,
            active: true,
            current_station: 0,
            route_fingerprint: event.route_fingerprint,
            created_at,
            ended_at: None,
        };
        events.push(created.clone());
        Ok(created)
    }

    async fn update_station(&self, id: Uuid, station: u32) -> Result<(), DomainError> {
        let mut events = lock(&self.events)?;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DomainError::event_not_found(id))?;
        event.current_station = event.current_station.max(station);
        Ok(())
    }

    async fn deactivate(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut events = lock(&self.events)?;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DomainError::event_not_found(id))?;
        if event.active {
            event.active = false;
            event.ended_at = Some(ended_at);
        }
        Ok(())
    }
}

/// Outcome log held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryOutcomeLog {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl InMemoryOutcomeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeLog for InMemoryOutcomeLog {
    async fn record(&self, records: &[DeliveryRecord]) -> Result<(), DomainError> {
        lock(&self.records)?.extend_from_slice(records);
        Ok(())
    }

    async fn for_event(&self, event_id: Uuid) -> Result<Vec<DeliveryRecord>, DomainError> {
        let mut records: Vec<DeliveryRecord> = lock(&self.records)?
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.station);
        Ok(records)
    }
}
