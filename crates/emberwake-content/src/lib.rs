//! Emberwake: content loading.
//!
//! Npcs, dialogue nodes and quests are authored as YAML or JSON documents.
//! This crate reads a content directory, resolves objective-type aliases,
//! validates cross references and builds the immutable catalogs the
//! resolver and the quest tracker run on.

pub mod document;
pub mod error;
pub mod loader;

mod convert;

pub use error::ContentError;
pub use loader::{Content, load_dir, load_str};
