//! Xianlu — Story Content context.
//!
//! Parses YAML story bundles, validates them against the narrative model and
//! compiles them into a ready-to-run `NarrativeEngine`. A default story ships
//! with the crate.

pub mod application;
pub mod domain;

pub use application::command_handlers::{
    CompiledStory, compile_story, handle_ingest_story, load_bundled_story,
};
pub use domain::document::StoryDocument;
pub use domain::errors::ContentError;
