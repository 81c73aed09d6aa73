//! The computed firing schedule of an event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stationcast_core::event::Event;
use uuid::Uuid;

/// One station of the timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableSlot {
    /// Station index, 1-based.
    pub station: u32,
    /// When the station's messages are sent.
    pub fires_at: DateTime<Utc>,
    /// When the station window closes (the next station fires).
    pub ends_at: DateTime<Utc>,
}

/// Station `i` fires at `start + i * duration`, for `i` in `1..=total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timetable {
    /// The event this timetable belongs to.
    pub event_id: Uuid,
    /// When the event clock started.
    pub start_time: DateTime<Utc>,
    /// One slot per station, in order.
    pub slots: Vec<TimetableSlot>,
}

impl Timetable {
    /// Derives the timetable from the persisted event.
    #[must_use]
    pub fn for_event(event: &Event) -> Self {
        let slots = (1..=event.total_stations)
            .map(|station| {
                let fires_at = event.fires_at(station);
                TimetableSlot {
                    station,
                    fires_at,
                    ends_at: fires_at + event.station_duration(),
                }
            })
            .collect();
        Self {
            event_id: event.id,
            start_time: event.start_time,
            slots,
        }
    }

    /// When the final station fires.
    #[must_use]
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.slots.last().map(|slot| slot.fires_at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use stationcast_core::event::Event;
    use uuid::Uuid;

    use super::Timetable;

    #[test]
    fn test_timetable_spaces_stations_by_duration() {
        // Arrange
        let start = Utc.with_ymd_and_hms(2026, 5, 2, 14, 0, 0).unwrap();
        let event = Event {
            id: Uuid::new_v4(),
            start_time: start,
            total_stations: 3,
            station_duration_secs: 60,
            active: true,
            current_station: 0,
            route_fingerprint: None,
            created_at: start,
            ended_at: None,
        };

        // Act
        let timetable = Timetable::for_event(&event);

        // Assert
        let fires: Vec<_> = timetable.slots.iter().map(|s| s.fires_at).collect();
        assert_eq!(
            fires,
            [
                start + TimeDelta::minutes(1),
                start + TimeDelta::minutes(2),
                start + TimeDelta::minutes(3),
            ]
        );
        assert_eq!(timetable.slots[0].ends_at, start + TimeDelta::minutes(2));
        assert_eq!(timetable.ends_at(), Some(start + TimeDelta::minutes(3)));
    }
}
