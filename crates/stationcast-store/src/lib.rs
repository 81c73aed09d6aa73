//! Stationcast Store: implementations of the participant, event and
//! outcome store contracts.
//!
//! The in-memory stores back single-process deployments and tests; the
//! `PostgreSQL` stores persist state across restarts so that recovery can
//! resume a running event.

pub mod memory;
pub mod pg;
pub mod schema;

pub use memory::{InMemoryEventStore, InMemoryOutcomeLog, InMemoryParticipantStore};
pub use pg::{PgEventStore, PgOutcomeLog, PgParticipantStore};
