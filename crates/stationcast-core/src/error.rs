//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A participant or event was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record that was looked up.
        entity: &'static str,
        /// The identifier that was looked up.
        id: Uuid,
    },

    /// The requested transition is not allowed in the current state
    /// (start while running, stop while idle, reload mid-event).
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for a missing participant.
    #[must_use]
    pub fn participant_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "participant",
            id,
        }
    }

    /// Shorthand for a missing event.
    #[must_use]
    pub fn event_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "event", id }
    }
}
