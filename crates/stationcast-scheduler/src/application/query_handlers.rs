//! Read-only queries over the scheduler's state.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::TimeDelta;
use stationcast_core::error::DomainError;
use stationcast_core::outcome::{DeliveryRecord, stuck_participants};
use uuid::Uuid;

use crate::application::scheduler::EventScheduler;
use crate::domain::status::EventStatus;

impl EventScheduler {
    /// Time until the final station fires, `None` when no event is running.
    /// Never negative.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failure.
    pub async fn remaining_time(&self) -> Result<Option<TimeDelta>, DomainError> {
        let Some(event) = self.inner.events.get_active().await? else {
            return Ok(None);
        };
        let remaining = event.ends_at() - self.inner.clock.now();
        Ok(Some(remaining.max(TimeDelta::zero())))
    }

    /// Snapshot of the running event and where participants are.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failure.
    pub async fn status(&self) -> Result<EventStatus, DomainError> {
        let inner = &self.inner;
        let Some(event) = inner.events.get_active().await? else {
            return Ok(EventStatus::idle(inner.config.total_stations));
        };
        let now = inner.clock.now();
        let elapsed = (now - event.start_time).max(TimeDelta::zero());
        let remaining = (event.ends_at() - now).max(TimeDelta::zero());
        let total = event.ends_at() - event.start_time;
        #[allow(clippy::cast_precision_loss)]
        let progress_percent = if total > TimeDelta::zero() {
            (elapsed.num_milliseconds() as f64 / total.num_milliseconds() as f64 * 100.0).min(100.0)
        } else {
            100.0
        };

        let participants = inner.participants.get_active().await?;
        let mut station_distribution = BTreeMap::new();
        for participant in &participants {
            *station_distribution
                .entry(participant.current_station)
                .or_insert(0) += 1;
        }

        Ok(EventStatus {
            running: true,
            event_id: Some(event.id),
            current_station: event.current_station,
            total_stations: event.total_stations,
            start_time: Some(event.start_time),
            elapsed_secs: elapsed.num_seconds(),
            remaining_secs: remaining.num_seconds(),
            progress_percent,
            next_fires_at: (!event.has_finished())
                .then(|| event.fires_at(event.current_station + 1)),
            active_participants: participants.len(),
            station_distribution,
        })
    }

    /// Delivery records of an event, defaulting to the running one.
    ///
    /// With `stuck_only`, returns only each participant's latest record,
    /// and only where it needs follow-up.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StateConflict` if no `event_id` is given and no
    /// event is running, and `DomainError::Infrastructure` on store failure.
    pub async fn outcomes(
        &self,
        event_id: Option<Uuid>,
        stuck_only: bool,
    ) -> Result<Vec<DeliveryRecord>, DomainError> {
        let inner = &self.inner;
        let event_id = match event_id {
            Some(id) => id,
            None => inner
                .events
                .get_active()
                .await?
                .map(|event| event.id)
                .ok_or_else(|| DomainError::StateConflict("no event is running".into()))?,
        };
        let records = inner.outcomes.for_event(event_id).await?;
        if stuck_only {
            Ok(stuck_participants(&records).into_iter().cloned().collect())
        } else {
            Ok(records)
        }
    }

    /// All participants as CSV, one row each, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failure.
    pub async fn participant_report_csv(&self) -> Result<String, DomainError> {
        let participants = self.inner.participants.list().await?;
        let routes = self.inner.routes();
        let total = self.inner.config.total_stations;

        let mut csv = String::from(
            "participant_number,recipient,display_name,current_station,progress,route,status,registered_at\n",
        );
        for participant in &participants {
            let route = routes
                .route(participant.number)
                .map(|route| route.join("-"))
                .unwrap_or_default();
            let status = if participant.active { "active" } else { "inactive" };
            // Writing to a String cannot fail.
            let _ = writeln!(
                csv,
                "{},{},{},{},{},{},{},{}",
                participant.formatted_number(),
                csv_field(&participant.recipient),
                csv_field(&participant.display_name),
                participant.current_station,
                participant.progress(total),
                csv_field(&route),
                status,
                participant.registered_at.to_rfc3339(),
            );
        }
        Ok(csv)
    }
}

/// Quotes a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
