//! Stationcast Dispatch: batched delivery to the outbound channel.
//!
//! The dispatcher sends fixed-size chunks with a pause between them, retries
//! transient failures under a bounded [`RetryPolicy`], and reports exactly
//! one outcome per input item. It never touches participant or event state.

pub mod dispatcher;
pub mod policy;

pub use dispatcher::{BatchDispatcher, DispatchItem, DispatchReport, ItemOutcome};
pub use policy::{DispatchConfig, RetryPolicy};
