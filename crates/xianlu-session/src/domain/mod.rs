//! Domain model for the Game Session context.

pub mod aggregates;
pub mod codec;
pub mod commands;
pub mod schema;
