//! Shared test fakes and utilities for the stationcast scheduler.

mod channel;
mod clock;
mod store;

pub use channel::{RecordingChannel, SentMessage};
pub use clock::{FixedClock, PausedClock};
pub use store::{FailingEventStore, FailingOutcomeLog, FailingParticipantStore, FlakyEventStore};
