//! Xianlu Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that every other
//! crate depends on: time, randomness, the persistence capability, the
//! state-changed signal and the shared error type. It contains no
//! infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod rng;
pub mod signal;
pub mod store;
