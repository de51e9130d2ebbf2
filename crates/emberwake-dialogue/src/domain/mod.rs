//! Dialogue domain types.

pub mod catalog;
pub mod commands;
pub mod condition;
pub mod consequences;
