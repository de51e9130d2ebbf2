//! Emberwake API: runtime wiring and the HTTP surface.
//!
//! `NarrativeRuntime` builds the flag store, ledgers, resolver, tracker and
//! bus from loaded content and serializes every action per subject. The
//! routes are thin JSON adapters over it.

pub mod config;
pub mod error;
pub mod routes;
pub mod runtime;
pub mod state;
