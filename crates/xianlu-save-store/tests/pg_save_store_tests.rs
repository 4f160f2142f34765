//! Integration tests for `PgSaveStore`.
//!
//! These need a PostgreSQL server reachable through `DATABASE_URL`; run them
//! with `--ignored`.

use sqlx::PgPool;
use xianlu_core::store::PersistenceStore;
use xianlu_save_store::PgSaveStore;

// --- load ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_load_returns_none_for_missing_key(pool: PgPool) {
    let store = PgSaveStore::new(pool);

    let value = store.load("missing").await.unwrap();

    assert!(value.is_none());
}

// --- save + load round-trip ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_save_and_load(pool: PgPool) {
    let store = PgSaveStore::new(pool);

    store.save("xianlu:save:last", "SGVsbG8=").await.unwrap();

    let loaded = store.load("xianlu:save:last").await.unwrap();
    assert_eq!(loaded.as_deref(), Some("SGVsbG8="));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_save_overwrites_existing_slot(pool: PgPool) {
    let store = PgSaveStore::new(pool);

    store.save("slot", "first").await.unwrap();
    store.save("slot", "second").await.unwrap();

    assert_eq!(store.load("slot").await.unwrap().as_deref(), Some("second"));
}

// --- clear ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_clear_removes_all_slots(pool: PgPool) {
    let store = PgSaveStore::new(pool);
    store.save("a", "1").await.unwrap();
    store.save("b", "2").await.unwrap();

    store.clear().await.unwrap();

    assert!(store.load("a").await.unwrap().is_none());
    assert!(store.load("b").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_ensure_table_is_idempotent(pool: PgPool) {
    let store = PgSaveStore::new(pool);

    store.ensure_table().await.unwrap();
    store.ensure_table().await.unwrap();
}
