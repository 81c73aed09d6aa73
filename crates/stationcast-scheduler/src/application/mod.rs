//! The scheduler service and its command and query handlers.

pub mod command_handlers;
pub mod query_handlers;
pub mod recovery;
pub mod scheduler;
