//! Application services for the Narrative Orchestration context.

pub mod engine;
pub mod query_handlers;
