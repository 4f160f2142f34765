//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Only save/load and infrastructure faults surface through this type; the
/// choice resolution pipeline recovers from everything else locally.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No game session exists with the given identifier.
    #[error("game not found: {0}")]
    GameNotFound(Uuid),

    /// A save code could not be decoded into a playable state.
    #[error("invalid save code: {0}")]
    InvalidSave(String),

    /// The game state could not be serialized, even in reduced form.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A validation error in domain logic or static content.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
