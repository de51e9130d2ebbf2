//! Emberwake: Quests bounded context.
//!
//! Quests advance without quest-specific code: the tracker listens to the
//! domain events on the bus, matches them against each active quest's
//! objectives, and completes and rewards a quest the moment every objective
//! is satisfied.

pub mod application;
pub mod domain;
