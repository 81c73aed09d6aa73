//! Station message and notice rendering.

use stationcast_core::participant::Participant;
use stationcast_routes::StationCatalog;

use crate::domain::status::StationReport;
use crate::domain::timetable::Timetable;

/// Renders the messages participants and administrators receive.
///
/// Only the station message is required; the notices have plain defaults.
pub trait MessageComposer: Send + Sync {
    /// Message for `participant` arriving at `station` of `total_stations`,
    /// whose route names `content` for this station.
    fn station_message(
        &self,
        participant: &Participant,
        station: u32,
        total_stations: u32,
        content: &str,
    ) -> String;

    /// Notice sent to every active participant when the event starts.
    fn event_started(&self, _participant: &Participant, timetable: &Timetable) -> String {
        let stations = timetable.slots.len();
        match timetable.slots.first() {
            Some(first) => format!(
                "The event has started! {stations} stations, the first at {} UTC.",
                first.fires_at.format("%H:%M:%S")
            ),
            None => "The event has started!".to_owned(),
        }
    }

    /// Notice sent to every active participant after the final station.
    fn event_completed(&self, _participant: &Participant, total_stations: u32) -> String {
        format!("You have completed all {total_stations} stations. Thank you for taking part!")
    }

    /// Administrator summary of one fired station.
    fn station_summary(&self, report: &StationReport, total_stations: u32) -> String {
        let mut summary = format!(
            "Station {}/{total_stations} started, participants notified: {}",
            report.station, report.delivered
        );
        if report.failed > 0 {
            summary.push_str(&format!(", failed: {}", report.failed));
        }
        if report.missing_route > 0 {
            summary.push_str(&format!(", without route: {}", report.missing_route));
        }
        summary
    }

    /// Administrator notice that the event completed.
    fn completion_summary(&self, notified: usize) -> String {
        format!("Event completed, participants notified: {notified}")
    }
}

/// One-line template: `Station 3/9: B`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainComposer;

impl MessageComposer for PlainComposer {
    fn station_message(
        &self,
        _participant: &Participant,
        station: u32,
        total_stations: u32,
        content: &str,
    ) -> String {
        format!("Station {station}/{total_stations}: {content}")
    }
}

/// Looks the content reference up in a station catalog and renders its name,
/// location and description. Falls back to the plain template for
/// uncatalogued references.
#[derive(Debug, Clone, Default)]
pub struct CatalogComposer {
    catalog: StationCatalog,
}

impl CatalogComposer {
    /// Creates a composer over `catalog`.
    #[must_use]
    pub fn new(catalog: StationCatalog) -> Self {
        Self { catalog }
    }
}

impl MessageComposer for CatalogComposer {
    fn station_message(
        &self,
        participant: &Participant,
        station: u32,
        total_stations: u32,
        content: &str,
    ) -> String {
        let Some(info) = self.catalog.get(content) else {
            return PlainComposer.station_message(participant, station, total_stations, content);
        };
        let name = if info.name.is_empty() {
            content
        } else {
            info.name.as_str()
        };
        let mut message = format!("Station {station}/{total_stations}: {name}");
        if !info.location.is_empty() {
            message.push_str("\nLocation: ");
            message.push_str(&info.location);
        }
        if !info.description.is_empty() {
            message.push_str("\n\n");
            message.push_str(&info.description);
        }
        message
    }
}
