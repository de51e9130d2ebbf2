//! Emberwake Core: shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that every bounded
//! context depends on: the event contract published on the bus, the keyed
//! record store, and the collaborator ledgers the narrative core consults.
//! It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod ledger;
pub mod record;
pub mod rng;
