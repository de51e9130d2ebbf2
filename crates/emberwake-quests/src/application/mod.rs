//! Quest tracking, commands and quest log queries.

pub mod command_handlers;
pub mod query_handlers;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_fixtures;
