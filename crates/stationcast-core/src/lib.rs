//! Stationcast Core: shared domain abstractions.
//!
//! This crate defines the data model and the collaborator traits (stores,
//! delivery channel, clock) that the route table, dispatcher and scheduler
//! depend on. It contains no infrastructure code.

pub mod channel;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod outcome;
pub mod participant;
pub mod repository;
