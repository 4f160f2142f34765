//! Command handlers for the Story Content context.
//!
//! Parse, validate, then build the graph and engine.

use tracing::{info, warn};
use xianlu_core::command::Command;
use xianlu_narrative::NarrativeEngine;
use xianlu_narrative::domain::graph::StoryGraph;

use crate::domain::commands::{IngestStory, StorySource};
use crate::domain::document::{StoryDocument, version_hash};
use crate::domain::errors::ContentError;
use crate::domain::validation::{ValidationIssue, validate};

/// The story shipped with the crate.
pub const BUNDLED_STORY: &str = include_str!("../../stories/story.yaml");

/// A validated story, ready to play.
#[derive(Debug, Clone)]
pub struct CompiledStory {
    pub title: String,
    /// SHA-256 of the source text.
    pub version_hash: String,
    pub engine: NarrativeEngine,
    /// Non-blocking findings from validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Parses, validates and compiles YAML story source.
///
/// # Errors
///
/// Returns `ContentError::Parse` for malformed YAML, `ContentError::Invalid`
/// listing every blocking validation error, or `ContentError::Domain` if the
/// graph cannot be built.
pub fn compile_story(source: &str) -> Result<CompiledStory, ContentError> {
    let document = StoryDocument::from_yaml(source)?;
    let report = validate(&document);

    if report.has_errors() {
        let errors: Vec<String> = report.errors().map(ToString::to_string).collect();
        warn!(count = errors.len(), "story failed validation");
        return Err(ContentError::Invalid(errors));
    }
    let warnings: Vec<ValidationIssue> = report.warnings().cloned().collect();
    for issue in &warnings {
        warn!(location = %issue.location, "{}", issue.message);
    }

    let StoryDocument {
        title,
        root,
        failure_node,
        death_node,
        experience_table,
        migrations,
        guards,
        late_events,
        config,
        nodes,
    } = document;
    let node_count = nodes.len();
    let graph = StoryGraph::new(nodes, &root, &failure_node, &death_node)?;
    let engine = NarrativeEngine::new(graph, experience_table)
        .with_migrations(migrations)
        .with_guards(guards)
        .with_late_events(late_events)
        .with_config(config);

    let version_hash = version_hash(source);
    info!(%title, nodes = node_count, %version_hash, "story compiled");
    Ok(CompiledStory {
        title,
        version_hash,
        engine,
        warnings,
    })
}

/// Compiles the bundled story.
///
/// # Errors
///
/// Only fails if the bundled story itself is broken.
pub fn load_bundled_story() -> Result<CompiledStory, ContentError> {
    compile_story(BUNDLED_STORY)
}

/// Handles the `IngestStory` command.
///
/// # Errors
///
/// Returns `ContentError::Io` if a story file cannot be read, plus anything
/// [`compile_story`] returns.
pub fn handle_ingest_story(command: &IngestStory) -> Result<CompiledStory, ContentError> {
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        "ingesting story"
    );
    match &command.source {
        StorySource::Bundled => load_bundled_story(),
        StorySource::Inline(source) => compile_story(source),
        StorySource::Path(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| ContentError::Io(format!("{}: {e}", path.display())))?;
            compile_story(&source)
        }
    }
}
