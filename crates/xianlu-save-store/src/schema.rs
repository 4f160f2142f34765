//! Save store database schema.

/// SQL to create the save slots table. Mirrors
/// `migrations/0001_create_save_slots.sql`.
pub const CREATE_SAVE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS save_slots (
    key         VARCHAR(255) PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
";
