//! Emberwake: Dialogue bounded context.
//!
//! Selects the dialogue node an npc says to a subject, filters the options
//! the subject may pick, and applies the consequences of a choice: flag,
//! item, relationship and experience changes followed by next-node
//! resolution.

pub mod application;
pub mod domain;
