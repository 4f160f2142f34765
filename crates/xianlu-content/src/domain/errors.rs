//! Content error types.

use thiserror::Error;
use xianlu_core::error::DomainError;

/// Failures while loading a story bundle.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The YAML could not be parsed into a story document.
    #[error("story parse error: {0}")]
    Parse(String),

    /// The story file could not be read.
    #[error("failed to read story file: {0}")]
    Io(String),

    /// Validation found blocking problems.
    #[error("story validation failed: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Graph construction rejected the story.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<ContentError> for DomainError {
    fn from(error: ContentError) -> Self {
        match error {
            ContentError::Domain(inner) => inner,
            other => DomainError::Validation(other.to_string()),
        }
    }
}
