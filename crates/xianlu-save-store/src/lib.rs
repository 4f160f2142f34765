//! Xianlu Save Store — `PersistenceStore` implementations.
//!
//! `PgSaveStore` keeps save slots in PostgreSQL; `MemoryStore` keeps them in
//! process for local play and tests.

pub mod memory_store;
pub mod pg_save_store;
pub mod schema;

pub use memory_store::MemoryStore;
pub use pg_save_store::PgSaveStore;
