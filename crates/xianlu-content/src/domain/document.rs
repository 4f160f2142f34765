//! The on-disk story bundle format.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use xianlu_character::ExperienceTable;
use xianlu_narrative::domain::config::EngineConfig;
use xianlu_narrative::domain::graph::Node;
use xianlu_narrative::domain::guards::InvariantGuards;
use xianlu_narrative::domain::late_events::LateEventTable;
use xianlu_narrative::domain::migration::MigrationMap;

use super::errors::ContentError;

/// Everything static a story needs: nodes plus the tables that drive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDocument {
    pub title: String,
    /// Node every new game starts on; also the fallback for unknown ids.
    pub root: String,
    /// Where failed forced choices land.
    pub failure_node: String,
    /// Ending reached when health drops to zero.
    pub death_node: String,
    #[serde(default)]
    pub experience_table: ExperienceTable,
    /// Legacy node id to canonical node id.
    #[serde(default)]
    pub migrations: MigrationMap,
    #[serde(default)]
    pub guards: InvariantGuards,
    #[serde(default)]
    pub late_events: LateEventTable,
    #[serde(default)]
    pub config: EngineConfig,
    pub nodes: Vec<Node>,
}

impl StoryDocument {
    /// Parses a YAML story bundle.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Parse` if the YAML is malformed or does not
    /// match the story schema.
    pub fn from_yaml(source: &str) -> Result<Self, ContentError> {
        serde_yaml::from_str(source).map_err(|e| ContentError::Parse(e.to_string()))
    }

    /// Looks up a node by id, without migration.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Hex SHA-256 of a story source, used to tell content revisions apart.
#[must_use]
pub fn version_hash(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

#[cfg(test)]
mod tests {
    use xianlu_character::AttributeKind;
    use xianlu_narrative::domain::condition::Condition;
    use xianlu_narrative::domain::effect::Effect;
    use xianlu_narrative::domain::graph::{NextNode, NodeKind};

    use super::*;

    const MINIMAL: &str = r"
title: 试炼
root: start
failure_node: start
death_node: dead
migrations:
  old_start: start
nodes:
  - id: start
    text: 山门
    choices:
      - id: climb
        text: 攀登石阶
        condition:
          attribute_at_least: [constitution, 8]
        condition_text: 需要体质≥8
        consequence:
          - adjust_attribute: [constitution, 1]
          - gain_experience: 20
          - advance_stage
        attribute_changes:
          constitution: 1
        next_node: dead
      - id: think
        text: 静思
        next_node:
          rules:
            - when:
                has_flag: enlightened
              goto: dead
          default: start
  - id: dead
    text: 身死道消
    kind: ending
";

    #[test]
    fn test_parses_minimal_story() {
        // Act
        let doc = StoryDocument::from_yaml(MINIMAL).unwrap();

        // Assert
        assert_eq!(doc.title, "试炼");
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.migrations.canonical("old_start"), Some("start"));
        assert_eq!(doc.experience_table, ExperienceTable::default());
        assert_eq!(doc.node("dead").unwrap().kind, NodeKind::Ending);

        let climb = &doc.node("start").unwrap().choices[0];
        assert_eq!(
            climb.condition,
            Some(Condition::AttributeAtLeast(AttributeKind::Constitution, 8))
        );
        assert_eq!(
            climb.consequence,
            vec![
                Effect::AdjustAttribute(AttributeKind::Constitution, 1),
                Effect::GainExperience(20),
                Effect::AdvanceStage,
            ]
        );
        assert_eq!(climb.next_node, NextNode::Static("dead".to_owned()));

        let think = &doc.node("start").unwrap().choices[1];
        assert!(matches!(think.next_node, NextNode::Computed(_)));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let result = StoryDocument::from_yaml("title: [unclosed");
        assert!(matches!(result, Err(ContentError::Parse(_))));
    }

    #[test]
    fn test_version_hash_tracks_content() {
        let a = version_hash(MINIMAL);
        let b = version_hash(&MINIMAL.replace("山门", "山脚"));

        assert_eq!(a.len(), 64);
        assert_eq!(a, version_hash(MINIMAL));
        assert_ne!(a, b);
    }
}
