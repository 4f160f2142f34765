//! Application services for the Story Content context.

pub mod command_handlers;
pub mod query_handlers;
