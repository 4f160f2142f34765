//! Domain model for the Character State context.

pub mod aggregates;
pub mod components;
pub mod progression;
