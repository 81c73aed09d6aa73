//! Command handlers for administrative commands.
//!
//! Each handler logs the command with its correlation ID and delegates to
//! the scheduler.

use stationcast_core::command::Command;
use stationcast_core::error::DomainError;
use stationcast_core::event::Event;
use stationcast_core::participant::Participant;
use tracing::info;

use crate::application::scheduler::EventScheduler;
use crate::domain::commands::{Broadcast, DeactivateParticipant, StartEvent, StopEvent};
use crate::domain::status::BroadcastReport;
use crate::domain::timetable::Timetable;

fn log_command(command: &dyn Command) {
    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        "handling command"
    );
}

/// Handles the `StartEvent` command.
///
/// # Errors
///
/// Returns `DomainError` as described on [`EventScheduler::start`].
pub async fn handle_start_event(
    command: &StartEvent,
    scheduler: &EventScheduler,
) -> Result<Timetable, DomainError> {
    log_command(command);
    scheduler.start(command.start_time).await
}

/// Handles the `StopEvent` command.
///
/// # Errors
///
/// Returns `DomainError` as described on [`EventScheduler::stop`].
pub async fn handle_stop_event(
    command: &StopEvent,
    scheduler: &EventScheduler,
) -> Result<Event, DomainError> {
    log_command(command);
    scheduler.stop().await
}

/// Handles the `Broadcast` command.
///
/// # Errors
///
/// Returns `DomainError` as described on [`EventScheduler::broadcast`].
pub async fn handle_broadcast(
    command: &Broadcast,
    scheduler: &EventScheduler,
) -> Result<BroadcastReport, DomainError> {
    log_command(command);
    scheduler.broadcast(&command.message).await
}

/// Handles the `DeactivateParticipant` command. Deactivation is permanent
/// for the running event; the participant is skipped from the next station
/// on. Waits for an in-flight firing to commit first.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the participant does not exist.
pub async fn handle_deactivate_participant(
    command: &DeactivateParticipant,
    scheduler: &EventScheduler,
) -> Result<Participant, DomainError> {
    log_command(command);
    scheduler
        .set_participant_active(command.participant_id, false)
        .await
}
