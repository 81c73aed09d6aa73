//! Administrative commands.

use chrono::{DateTime, Utc};
use stationcast_core::command::Command;
use uuid::Uuid;

/// Command to start the event.
#[derive(Debug, Clone)]
pub struct StartEvent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// When the event clock starts; `None` means now.
    pub start_time: Option<DateTime<Utc>>,
}

/// Command to stop the running event.
#[derive(Debug, Clone)]
pub struct StopEvent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

/// Command to send one free-form message to every active participant.
#[derive(Debug, Clone)]
pub struct Broadcast {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Message body.
    pub message: String,
}

/// Command to withdraw a participant from later broadcasts.
#[derive(Debug, Clone)]
pub struct DeactivateParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The participant to deactivate.
    pub participant_id: Uuid,
}

impl Command for StartEvent {
    fn command_type(&self) -> &'static str {
        "event.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for StopEvent {
    fn command_type(&self) -> &'static str {
        "event.stop"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for Broadcast {
    fn command_type(&self) -> &'static str {
        "event.broadcast"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for DeactivateParticipant {
    fn command_type(&self) -> &'static str {
        "participant.deactivate"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
