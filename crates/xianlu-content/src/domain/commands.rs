//! Commands for the Story Content context.

use std::path::PathBuf;

use uuid::Uuid;
use xianlu_core::command::Command;

/// Where a story bundle comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorySource {
    /// The story compiled into this crate.
    Bundled,
    /// A YAML file on disk.
    Path(PathBuf),
    /// YAML text already in memory.
    Inline(String),
}

/// Command to ingest, validate and compile a story bundle.
#[derive(Debug, Clone)]
pub struct IngestStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub source: StorySource,
}

impl Command for IngestStory {
    fn command_type(&self) -> &'static str {
        "content.ingest_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
