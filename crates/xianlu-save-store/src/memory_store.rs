//! In-process `PersistenceStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use xianlu_core::error::DomainError;
use xianlu_core::store::PersistenceStore;

/// Save slots held in memory; everything is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.slots
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.slots.write().await.clear();
        Ok(())
    }
}
