//! Domain model for the Narrative Orchestration context.

pub mod condition;
pub mod config;
pub mod effect;
pub mod gating;
pub mod graph;
pub mod guards;
pub mod late_events;
pub mod migration;
pub mod penalty;
pub mod resolver;
pub mod transition;
