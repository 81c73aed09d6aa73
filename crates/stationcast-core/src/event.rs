//! The singleton event run.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted state of one event run.
///
/// At most one event is active at a time. Firing times are never stored;
/// they are always derived from `start_time` and `station_duration_secs` so
/// that a restarted process recomputes the same timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub id: Uuid,
    /// When the event clock starts. Station `k` fires at `start + k * duration`.
    pub start_time: DateTime<Utc>,
    /// Number of stations every participant passes through.
    pub total_stations: u32,
    /// Length of one station window, in seconds.
    pub station_duration_secs: i64,
    /// Whether the event is currently running.
    pub active: bool,
    /// The last station that was fired (0 = none yet).
    pub current_station: u32,
    /// SHA-256 fingerprint of the route table the event runs against.
    pub route_fingerprint: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the event was stopped or completed.
    pub ended_at: Option<DateTime<Utc>>,
}

/// Input for creating a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// When the event clock starts.
    pub start_time: DateTime<Utc>,
    /// Number of stations.
    pub total_stations: u32,
    /// Length of one station window, in seconds.
    pub station_duration_secs: i64,
    /// Fingerprint of the loaded route table.
    pub route_fingerprint: Option<String>,
}

impl Event {
    /// Station window length.
    #[must_use]
    pub fn station_duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.station_duration_secs)
    }

    /// The instant at which `station` fires.
    #[must_use]
    pub fn fires_at(&self, station: u32) -> DateTime<Utc> {
        self.start_time + TimeDelta::seconds(self.station_duration_secs * i64::from(station))
    }

    /// The instant the final station fires and the event completes.
    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.fires_at(self.total_stations)
    }

    /// The highest station whose firing time is at or before `now`, clamped
    /// to `total_stations`.
    #[must_use]
    pub fn due_station(&self, now: DateTime<Utc>) -> u32 {
        if self.station_duration_secs <= 0 {
            return self.total_stations;
        }
        let elapsed = (now - self.start_time).num_seconds();
        if elapsed < 0 {
            return 0;
        }
        let due = elapsed / self.station_duration_secs;
        u32::try_from(due).map_or(self.total_stations, |d| d.min(self.total_stations))
    }

    /// Whether the final station has been fired.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.current_station >= self.total_stations
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::Event;

    fn event(total_stations: u32, station_duration_secs: i64) -> Event {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            start_time: start,
            total_stations,
            station_duration_secs,
            active: true,
            current_station: 0,
            route_fingerprint: None,
            created_at: start,
            ended_at: None,
        }
    }

    #[test]
    fn test_fires_at_is_start_plus_station_times_duration() {
        let event = event(9, 480);

        assert_eq!(event.fires_at(1), event.start_time + chrono::TimeDelta::minutes(8));
        assert_eq!(event.fires_at(9), event.start_time + chrono::TimeDelta::minutes(72));
        assert_eq!(event.ends_at(), event.fires_at(9));
    }

    #[test]
    fn test_due_station_is_zero_before_first_boundary() {
        let event = event(3, 60);

        assert_eq!(event.due_station(event.start_time - chrono::TimeDelta::seconds(5)), 0);
        assert_eq!(event.due_station(event.start_time + chrono::TimeDelta::seconds(59)), 0);
    }

    #[test]
    fn test_due_station_counts_elapsed_boundaries_and_clamps() {
        let event = event(3, 60);

        assert_eq!(event.due_station(event.start_time + chrono::TimeDelta::seconds(60)), 1);
        assert_eq!(event.due_station(event.start_time + chrono::TimeDelta::seconds(150)), 2);
        assert_eq!(event.due_station(event.start_time + chrono::TimeDelta::hours(5)), 3);
    }

    #[test]
    fn test_has_finished_after_final_station() {
        let mut event = event(2, 60);
        assert!(!event.has_finished());

        event.current_station = 2;

        assert!(event.has_finished());
    }
}
