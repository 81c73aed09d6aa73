//! Restart recovery.
//!
//! Firing times are derived from the persisted event, so a restarted
//! process only needs to find the active event and re-arm its timeline.
//! Under catch-up the timeline then fires every overdue station back to
//! back; under jump-to-latest the overdue stations except the latest are
//! first marked as skipped.

use stationcast_core::error::DomainError;
use stationcast_core::outcome::DeliveryStatus;
use tracing::{error, info, instrument, warn};

use crate::application::scheduler::{EventScheduler, delivery_record};
use crate::domain::config::RecoveryPolicy;
use crate::domain::status::RecoveryOutcome;

impl EventScheduler {
    /// Resumes an event left active by a previous process.
    ///
    /// Call once at process start, before serving commands.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failure.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<RecoveryOutcome, DomainError> {
        let inner = &self.inner;
        let Some(event) = inner.events.get_active().await? else {
            info!("no active event to recover");
            return Ok(RecoveryOutcome::Idle);
        };

        let now = inner.clock.now();
        let due = event.due_station(now);
        let current = event.current_station;
        let mut skipped = 0;

        if current > due {
            error!(
                event_id = %event.id,
                current_station = current,
                due_station = due,
                start_time = %event.start_time,
                "recovery ambiguity: persisted station is ahead of the clock; resuming from the persisted station"
            );
        } else if inner.config.recovery == RecoveryPolicy::JumpToLatest && due > current + 1 {
            let _guard = inner.firing.lock().await;
            for station in current + 1..due {
                let participants = inner.participants.list().await?;
                let plan = inner.plan_station(participants, station, event.total_stations);
                let mut records = Vec::new();
                let mut advance = Vec::new();
                for (participant, _message) in &plan.sends {
                    records.push(delivery_record(
                        event.id,
                        station,
                        participant.id,
                        DeliveryStatus::SkippedRecovery,
                        now,
                    ));
                    advance.push(participant.id);
                }
                for participant in &plan.inactive {
                    records.push(delivery_record(
                        event.id,
                        station,
                        participant.id,
                        DeliveryStatus::SkippedInactive,
                        now,
                    ));
                    advance.push(participant.id);
                }
                for participant in &plan.missing {
                    records.push(delivery_record(
                        event.id,
                        station,
                        participant.id,
                        DeliveryStatus::MissingRoute,
                        now,
                    ));
                }
                inner.advance_participants(&advance, station).await;
                inner.record_outcomes(&records).await;
                inner.events.update_station(event.id, station).await?;
                skipped += 1;
            }
            warn!(
                event_id = %event.id,
                skipped,
                resume_station = due,
                "skipped overdue stations during recovery"
            );
        } else if due > current {
            info!(
                event_id = %event.id,
                overdue = due - current,
                "catching up overdue stations"
            );
        }

        self.arm_timeline(event.id, false);
        info!(
            event_id = %event.id,
            current_station = current,
            due_station = due,
            policy = %inner.config.recovery,
            "event recovered"
        );
        Ok(RecoveryOutcome::Resumed {
            event_id: event.id,
            current_station: current,
            due_station: due,
            skipped,
        })
    }
}
