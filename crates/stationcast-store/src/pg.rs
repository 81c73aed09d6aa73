//! `PostgreSQL` implementations of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stationcast_core::error::DomainError;
use stationcast_core::event::{Event, NewEvent};
use stationcast_core::outcome::DeliveryRecord;
use stationcast_core::participant::{NewParticipant, Participant};
use stationcast_core::repository::{EventStateStore, OutcomeLog, ParticipantStore};
use tracing::debug;
use uuid::Uuid;

use crate::memory::{check_capacity, first_free_number, validate_requested_number};

const PARTICIPANT_COLUMNS: &str =
    "id, number, recipient, display_name, current_station, active, registered_at";

const EVENT_COLUMNS: &str = "id, start_time, total_stations, station_duration_secs, active, \
     current_station, route_fingerprint, created_at, ended_at";

fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn column_u32(value: i32, column: &str) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative value in {column}: {value}")))
}

fn param_i32(value: u32) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| DomainError::Validation(format!("value out of range: {value}")))
}

#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    id: Uuid,
    number: i32,
    recipient: String,
    display_name: String,
    current_station: i32,
    active: bool,
    registered_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = DomainError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            number: column_u32(row.number, "participants.number")?,
            recipient: row.recipient,
            display_name: row.display_name,
            current_station: column_u32(row.current_station, "participants.current_station")?,
            active: row.active,
            registered_at: row.registered_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    start_time: DateTime<Utc>,
    total_stations: i32,
    station_duration_secs: i64,
    active: bool,
    current_station: i32,
    route_fingerprint: Option<String>,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for Event {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            start_time: row.start_time,
            total_stations: column_u32(row.total_stations, "events.total_stations")?,
            station_duration_secs: row.station_duration_secs,
            active: row.active,
            current_station: column_u32(row.current_station, "events.current_station")?,
            route_fingerprint: row.route_fingerprint,
            created_at: row.created_at,
            ended_at: row.ended_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRecordRow {
    event_id: Uuid,
    station: i32,
    participant_id: Uuid,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRecordRow> for DeliveryRecord {
    type Error = DomainError;

    fn try_from(row: DeliveryRecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: row.event_id,
            station: column_u32(row.station, "delivery_records.station")?,
            participant_id: row.participant_id,
            status: row.status.parse().map_err(DomainError::Infrastructure)?,
            attempts: column_u32(row.attempts, "delivery_records.attempts")?,
            last_error: row
                .last_error
                .map(|class| class.parse())
                .transpose()
                .map_err(DomainError::Infrastructure)?,
            recorded_at: row.recorded_at,
        })
    }
}

/// PostgreSQL-backed participant store.
#[derive(Debug, Clone)]
pub struct PgParticipantStore {
    pool: PgPool,
    limit: Option<u32>,
}

impl PgParticipantStore {
    /// Creates a new `PgParticipantStore` without a participant limit.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool, limit: None }
    }

    /// Accepts at most `max` participants.
    #[must_use]
    pub fn with_limit(mut self, max: u32) -> Self {
        self.limit = Some(max);
        self
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Participant>, DomainError> {
        sqlx::query_as::<_, ParticipantRow>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(Participant::try_from)
            .collect()
    }
}

#[async_trait]
impl ParticipantStore for PgParticipantStore {
    async fn register(
        &self,
        participant: NewParticipant,
        registered_at: DateTime<Utc>,
    ) -> Result<Participant, DomainError> {
        validate_requested_number(participant.number, self.limit)?;
        let mut tx = self.pool.begin().await.map_err(infra)?;
        // Serializes registrations so the count below cannot go stale;
        // readers are not blocked.
        sqlx::query("LOCK TABLE participants IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(infra)?;

        let existing = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE recipient = $1"
        ))
        .bind(&participant.recipient)
        .fetch_optional(&mut *tx)
        .await
        .map_err(infra)?;
        if let Some(row) = existing {
            tx.commit().await.map_err(infra)?;
            return row.try_into();
        }

        let registered: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
            .fetch_one(&mut *tx)
            .await
            .map_err(infra)?;
        check_capacity(usize::try_from(registered).unwrap_or(usize::MAX), self.limit)?;

        let number = match participant.number {
            Some(number) => number,
            None => {
                let taken: Vec<i32> = sqlx::query_scalar("SELECT number FROM participants")
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(infra)?;
                first_free_number(taken.into_iter().filter_map(|n| u32::try_from(n).ok()))
            }
        };

        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "INSERT INTO participants (id, number, recipient, display_name, registered_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(param_i32(number)?)
        .bind(&participant.recipient)
        .bind(&participant.display_name)
        .bind(registered_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DomainError::StateConflict(format!("participant number {number} is already taken"))
            } else {
                infra(err)
            }
        })?;
        tx.commit().await.map_err(infra)?;

        debug!(number, "participant registered");
        row.try_into()
    }

    async fn get(&self, id: Uuid) -> Result<Participant, DomainError> {
        sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .ok_or_else(|| DomainError::participant_not_found(id))?
        .try_into()
    }

    async fn list(&self) -> Result<Vec<Participant>, DomainError> {
        self.fetch(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants ORDER BY number"
        ))
        .await
    }

    async fn get_active(&self) -> Result<Vec<Participant>, DomainError> {
        self.fetch(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE active ORDER BY number"
        ))
        .await
    }

    async fn update_station(&self, id: Uuid, station: u32) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE participants SET current_station = GREATEST(current_station, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(param_i32(station)?)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::participant_not_found(id));
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE participants SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::participant_not_found(id));
        }
        Ok(())
    }
}

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStateStore for PgEventStore {
    async fn get_active(&self) -> Result<Option<Event>, DomainError> {
        sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE active"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?
        .map(Event::try_from)
        .transpose()
    }

    async fn create(&self, event: NewEvent, created_at: DateTime<Utc>) -> Result<Event, DomainError> {
        sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO events (id, start_time, total_stations, station_duration_secs,
                                 route_fingerprint, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(event.start_time)
        .bind(param_i32(event.total_stations)?)
        .bind(event.station_duration_secs)
        .bind(event.route_fingerprint)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DomainError::StateConflict("an event is already running".into())
            } else {
                infra(err)
            }
        })?
        .try_into()
    }

    async fn update_station(&self, id: Uuid, station: u32) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE events SET current_station = GREATEST(current_station, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(param_i32(station)?)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::event_not_found(id));
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE events SET active = FALSE, ended_at = COALESCE(ended_at, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(ended_at)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::event_not_found(id));
        }
        Ok(())
    }
}

/// PostgreSQL-backed outcome log.
#[derive(Debug, Clone)]
pub struct PgOutcomeLog {
    pool: PgPool,
}

impl PgOutcomeLog {
    /// Creates a new `PgOutcomeLog`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutcomeLog for PgOutcomeLog {
    async fn record(&self, records: &[DeliveryRecord]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;
        for record in records {
            sqlx::query(
                "INSERT INTO delivery_records
                     (event_id, station, participant_id, status, attempts, last_error, recorded_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(record.event_id)
            .bind(param_i32(record.station)?)
            .bind(record.participant_id)
            .bind(record.status.as_str())
            .bind(param_i32(record.attempts)?)
            .bind(record.last_error.map(|class| class.as_str()))
            .bind(record.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        }
        tx.commit().await.map_err(infra)
    }

    async fn for_event(&self, event_id: Uuid) -> Result<Vec<DeliveryRecord>, DomainError> {
        sqlx::query_as::<_, DeliveryRecordRow>(
            "SELECT event_id, station, participant_id, status, attempts, last_error, recorded_at
             FROM delivery_records WHERE event_id = $1 ORDER BY station, id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?
        .into_iter()
        .map(DeliveryRecord::try_from)
        .collect()
    }
}
