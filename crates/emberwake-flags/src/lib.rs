//! Emberwake Flags: the per-subject set of narrative facts.
//!
//! A flag is a history marker: once set it stays set during ordinary play.
//! Only the administrative `remove` and `clear_all` operations delete flags.

pub mod flag_store;

pub use flag_store::{Flag, FlagStore};
