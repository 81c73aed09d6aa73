//! Stationcast Scheduler: event progression and broadcast.
//!
//! Drives a single event through its stations on a shared clock. At every
//! station boundary the scheduler resolves each active participant's next
//! content from the route table, fans the messages out through the batch
//! dispatcher, and advances participant and event state.

pub mod application;
pub mod domain;

pub use application::scheduler::{Collaborators, EventScheduler};
pub use domain::compose::{CatalogComposer, MessageComposer, PlainComposer};
pub use domain::config::{PermanentFailurePolicy, RecoveryPolicy, SchedulerConfig, StopPolicy};
pub use domain::status::{BroadcastReport, EventStatus, RecoveryOutcome, StationReport};
pub use domain::timetable::{Timetable, TimetableSlot};
