//! Shared application state.

use std::path::PathBuf;

use stationcast_scheduler::EventScheduler;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The event scheduler; owns the stores, channel and route table.
    pub scheduler: EventScheduler,
    /// Route table CSV re-read by a reload without a body.
    pub routes_path: PathBuf,
    /// Participant cap, for registration and route validation.
    pub max_participants: u32,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(scheduler: EventScheduler, routes_path: PathBuf, max_participants: u32) -> Self {
        Self {
            scheduler,
            routes_path,
            max_participants,
        }
    }
}
