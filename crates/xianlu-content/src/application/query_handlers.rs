//! Query handlers for the Story Content context.

use std::collections::BTreeMap;

use serde::Serialize;
use xianlu_narrative::domain::graph::NodeKind;

use crate::application::command_handlers::CompiledStory;

/// Overview of a loaded story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySummary {
    pub title: String,
    pub version_hash: String,
    pub node_count: usize,
    /// Node count per chapter.
    pub chapters: BTreeMap<u32, usize>,
    /// Ids of every ending node.
    pub endings: Vec<String>,
    pub warning_count: usize,
}

/// Summarises a compiled story.
#[must_use]
pub fn story_summary(story: &CompiledStory) -> StorySummary {
    let graph = story.engine.graph();
    let mut chapters = BTreeMap::new();
    let mut endings = Vec::new();
    for node in graph.nodes() {
        *chapters.entry(node.chapter).or_insert(0) += 1;
        if node.kind == NodeKind::Ending {
            endings.push(node.id.clone());
        }
    }

    StorySummary {
        title: story.title.clone(),
        version_hash: story.version_hash.clone(),
        node_count: graph.len(),
        chapters,
        endings,
        warning_count: story.warnings.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command_handlers::load_bundled_story;

    #[test]
    fn test_summary_of_bundled_story() {
        // Arrange
        let story = load_bundled_story().unwrap();

        // Act
        let summary = story_summary(&story);

        // Assert
        assert_eq!(summary.title, "仙路");
        assert_eq!(summary.node_count, 20);
        assert_eq!(
            summary.endings,
            vec!["mortal_life", "demonic_path", "ascension", "death"]
        );
        assert_eq!(summary.chapters.get(&2), Some(&5));
        assert_eq!(summary.warning_count, 0);
    }
}
