//! Application services for the Game Session context.

pub mod autosave;
pub mod command_handlers;
pub mod query_handlers;
