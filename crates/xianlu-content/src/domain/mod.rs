//! Domain model for the Story Content context.

pub mod commands;
pub mod document;
pub mod errors;
pub mod validation;
