//! Scheduler domain types.

pub mod commands;
pub mod compose;
pub mod config;
pub mod status;
pub mod timetable;
