//! Dialogue application services and command handlers.

pub mod command_handlers;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_fixtures;
