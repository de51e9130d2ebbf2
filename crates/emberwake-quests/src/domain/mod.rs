//! Quest content and per-subject progress.

pub mod commands;
pub mod definition;
pub mod objective;
pub mod progress;
