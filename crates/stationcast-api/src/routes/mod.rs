//! Route modules, one per administrative area.

pub mod event;
pub mod health;
pub mod participants;
pub mod route_table;
