//! Persistence capability abstraction.
//!
//! The engine never touches storage directly; the session layer is handed a
//! `PersistenceStore` and keeps everything it persists behind string keys.

use async_trait::async_trait;

use crate::error::DomainError;

/// Key/value persistence capability injected into the session layer.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Load the value stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Remove every persisted value.
    async fn clear(&self) -> Result<(), DomainError>;
}
