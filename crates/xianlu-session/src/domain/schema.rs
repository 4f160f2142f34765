//! Save schema version guard.
//!
//! Distinct from node-id migration: a schema mismatch is destructive. Every
//! persisted value is wiped and the caller is told once.

use serde::Serialize;
use tracing::{info, warn};
use xianlu_core::error::DomainError;
use xianlu_core::store::PersistenceStore;

/// Current save format. Bump whenever an old save can no longer be read.
pub const SCHEMA_VERSION: u32 = 3;

/// Store key holding the schema version persisted data was written with.
pub const SCHEMA_MARKER_KEY: &str = "xianlu:schema_version";

/// Outcome of [`ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaCheck {
    /// Nothing was persisted; the store has been stamped.
    Fresh,
    /// The marker matches.
    Current,
    /// Persisted data predates the current schema and was wiped.
    Wiped { found: Option<u32> },
}

impl SchemaCheck {
    /// The one-time message to show the player, if any.
    #[must_use]
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Wiped { .. } => Some("存档格式已更新，旧的存档已被清除。"),
            Self::Fresh | Self::Current => None,
        }
    }
}

/// Compares the persisted schema marker with [`SCHEMA_VERSION`].
///
/// `probe_key` is a key that holds data whenever anything was ever saved;
/// data under it without a marker counts as a legacy save.
///
/// # Errors
///
/// Propagates store failures.
pub async fn ensure_schema(
    store: &dyn PersistenceStore,
    probe_key: &str,
) -> Result<SchemaCheck, DomainError> {
    let marker = store.load(SCHEMA_MARKER_KEY).await?;
    let found = marker.as_deref().map(str::trim).map(str::parse::<u32>);

    let check = match found {
        Some(Ok(version)) if version == SCHEMA_VERSION => return Ok(SchemaCheck::Current),
        Some(Ok(version)) => SchemaCheck::Wiped {
            found: Some(version),
        },
        Some(Err(_)) => SchemaCheck::Wiped { found: None },
        None => {
            if store.load(probe_key).await?.is_some() {
                SchemaCheck::Wiped { found: None }
            } else {
                SchemaCheck::Fresh
            }
        }
    };

    if let SchemaCheck::Wiped { found } = check {
        warn!(?found, current = SCHEMA_VERSION, "save schema changed, wiping persisted state");
        store.clear().await?;
    } else {
        info!(current = SCHEMA_VERSION, "stamping fresh save store");
    }
    store
        .save(SCHEMA_MARKER_KEY, &SCHEMA_VERSION.to_string())
        .await?;
    Ok(check)
}

#[cfg(test)]
mod tests {
    use xianlu_test_support::{FailingStore, RecordingStore};

    use super::*;

    const PROBE: &str = "xianlu:autosave";

    #[tokio::test]
    async fn test_fresh_store_is_stamped_silently() {
        // Arrange
        let store = RecordingStore::new();

        // Act
        let check = ensure_schema(&store, PROBE).await.unwrap();

        // Assert
        assert_eq!(check, SchemaCheck::Fresh);
        assert_eq!(check.notice(), None);
        assert_eq!(store.clear_count(), 0);
        assert_eq!(store.get(SCHEMA_MARKER_KEY), Some(SCHEMA_VERSION.to_string()));
    }

    #[tokio::test]
    async fn test_current_marker_is_left_alone() {
        let store = RecordingStore::with_entries([
            (SCHEMA_MARKER_KEY.to_owned(), SCHEMA_VERSION.to_string()),
            (PROBE.to_owned(), "code".to_owned()),
        ]);

        let check = ensure_schema(&store, PROBE).await.unwrap();

        assert_eq!(check, SchemaCheck::Current);
        assert!(store.saved().is_empty());
        assert_eq!(store.get(PROBE).as_deref(), Some("code"));
    }

    #[tokio::test]
    async fn test_old_marker_wipes_and_notifies() {
        // Arrange
        let store = RecordingStore::with_entries([
            (SCHEMA_MARKER_KEY, "1"),
            (PROBE, "old code"),
        ]);

        // Act
        let check = ensure_schema(&store, PROBE).await.unwrap();

        // Assert
        assert_eq!(check, SchemaCheck::Wiped { found: Some(1) });
        assert!(check.notice().is_some());
        assert_eq!(store.clear_count(), 1);
        assert_eq!(store.get(PROBE), None);
        assert_eq!(store.get(SCHEMA_MARKER_KEY), Some(SCHEMA_VERSION.to_string()));
    }

    #[tokio::test]
    async fn test_unmarked_legacy_data_is_wiped() {
        let store = RecordingStore::with_entries([(PROBE, "legacy code")]);

        let check = ensure_schema(&store, PROBE).await.unwrap();

        assert_eq!(check, SchemaCheck::Wiped { found: None });
        assert_eq!(store.get(PROBE), None);
    }

    #[tokio::test]
    async fn test_second_run_after_wipe_is_current() {
        let store = RecordingStore::with_entries([(SCHEMA_MARKER_KEY, "garbage")]);

        assert_eq!(
            ensure_schema(&store, PROBE).await.unwrap(),
            SchemaCheck::Wiped { found: None }
        );
        assert_eq!(ensure_schema(&store, PROBE).await.unwrap(), SchemaCheck::Current);
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let result = ensure_schema(&FailingStore, PROBE).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
