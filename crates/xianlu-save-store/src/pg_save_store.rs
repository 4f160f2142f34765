//! `PostgreSQL` implementation of the `PersistenceStore` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use xianlu_core::error::DomainError;
use xianlu_core::store::PersistenceStore;

use crate::schema::CREATE_SAVE_SLOTS_TABLE;

fn infrastructure(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(e.to_string())
}

/// PostgreSQL-backed save slots.
#[derive(Debug, Clone)]
pub struct PgSaveStore {
    pool: PgPool,
}

impl PgSaveStore {
    /// Creates a new `PgSaveStore` over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and makes sure the table exists.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the connection or the table
    /// creation fails.
    pub async fn connect(database_url: &str) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(infrastructure)?;
        let store = Self::new(pool);
        store.ensure_table().await?;
        info!("connected to save store");
        Ok(store)
    }

    /// Creates the save slots table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on a database error.
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(CREATE_SAVE_SLOTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for PgSaveStore {
    async fn load(&self, key: &str) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM save_slots WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO save_slots (key, value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        debug!(%key, "save slot written");
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM save_slots")
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        info!(removed = result.rows_affected(), "save slots cleared");
        Ok(())
    }
}
