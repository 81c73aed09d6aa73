//! Stationcast Routes: per-participant station routes.
//!
//! A route table maps each participant number to the ordered content
//! references of every station. It is loaded once from a tabular source,
//! validated as a whole, and never mutated while an event runs.

pub mod catalog;
pub mod error;
pub mod table;

pub use catalog::{StationCatalog, StationInfo};
pub use error::{CatalogError, RouteError, RouteIssue, RouteLoadError};
pub use table::{RouteReport, RouteTable};
