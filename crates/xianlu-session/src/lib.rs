//! Xianlu — Game Session context.
//!
//! Owns the lifecycle of one playthrough: starting, choosing, resetting,
//! saving and loading. Save codes are produced by the persistence codec and
//! written through a debounced autosave worker; the schema guard wipes stale
//! persisted state when the save format changes.

pub mod application;
pub mod domain;

pub use domain::aggregates::GameSession;
pub use domain::codec::{decode, encode};
pub use domain::schema::{SCHEMA_VERSION, SchemaCheck, ensure_schema};
