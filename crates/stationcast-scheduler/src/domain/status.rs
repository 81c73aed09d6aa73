//! Read models returned by the scheduler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Snapshot of the event for administrators.
#[derive(Debug, Clone, Serialize)]
pub struct EventStatus {
    /// Whether an event is running.
    pub running: bool,
    /// The running event, if any.
    pub event_id: Option<Uuid>,
    /// Last fired station.
    pub current_station: u32,
    /// Stations in the event.
    pub total_stations: u32,
    /// When the event clock started.
    pub start_time: Option<DateTime<Utc>>,
    /// Seconds since the start (0 before it).
    pub elapsed_secs: i64,
    /// Seconds until the final station fires.
    pub remaining_secs: i64,
    /// Elapsed share of the total event length, 0 to 100.
    pub progress_percent: f64,
    /// When the next station fires.
    pub next_fires_at: Option<DateTime<Utc>>,
    /// Active participants.
    pub active_participants: usize,
    /// Active participants per current station.
    pub station_distribution: BTreeMap<u32, usize>,
}

impl EventStatus {
    /// Status when no event is running.
    #[must_use]
    pub fn idle(total_stations: u32) -> Self {
        Self {
            running: false,
            event_id: None,
            current_station: 0,
            total_stations,
            start_time: None,
            elapsed_secs: 0,
            remaining_secs: 0,
            progress_percent: 0.0,
            next_fires_at: None,
            active_participants: 0,
            station_distribution: BTreeMap::new(),
        }
    }
}

/// Aggregate result of one station firing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StationReport {
    /// The fired station.
    pub station: u32,
    /// Messages the channel accepted.
    pub delivered: usize,
    /// Messages that failed after retries or permanently.
    pub failed: usize,
    /// Messages skipped by an aborting stop.
    pub aborted: usize,
    /// Active participants without content for this station.
    pub missing_route: usize,
    /// Inactive participants advanced without a message.
    pub skipped_inactive: usize,
    /// Participants deactivated after a permanent failure.
    pub deactivated: usize,
    /// Dispatch chunks sent.
    pub chunks: usize,
    /// Whether this was the final station.
    pub completed: bool,
}

/// Aggregate result of a manual broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Active participants addressed.
    pub recipients: usize,
    /// Messages the channel accepted.
    pub delivered: usize,
    /// Messages that failed.
    pub failed: usize,
}

/// What `recover` found and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// No event was active.
    Idle,
    /// An active event was found and its timeline re-armed.
    Resumed {
        /// The resumed event.
        event_id: Uuid,
        /// Last fired station at restart.
        current_station: u32,
        /// Highest station due by the clock at restart.
        due_station: u32,
        /// Stations passed over without dispatch.
        skipped: u32,
    },
}
