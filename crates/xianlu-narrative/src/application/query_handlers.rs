//! Query handlers for the Narrative Orchestration context.
//!
//! Read-only projections of the current node for a renderer.

use std::collections::BTreeMap;

use serde::Serialize;
use xianlu_character::{AttributeKind, Character};

use crate::application::engine::NarrativeEngine;
use crate::domain::graph::NodeKind;

/// A choice as the player sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceView {
    pub id: String,
    pub text: String,
    /// Whether the condition currently holds. Unavailable choices may still
    /// be forced.
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_text: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_changes: BTreeMap<AttributeKind, i32>,
    /// Chance that forcing this choice fails; set only for unavailable
    /// choices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_probability: Option<u32>,
}

/// The node the character stands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: String,
    pub text: String,
    pub kind: NodeKind,
    pub chapter: u32,
    pub section: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub choices: Vec<ChoiceView>,
}

/// Builds the view of `character`'s current node.
///
/// Unknown node ids resolve like any other (migration, then root), so this
/// always produces a view. An ended run shows no choices.
#[must_use]
pub fn current_node_view(engine: &NarrativeEngine, character: &Character) -> NodeView {
    let node = engine.resolver().resolve(&character.current_node);
    let failure_probability = engine.failure_probability(character);

    let choices = if character.is_game_ended {
        Vec::new()
    } else {
        node.choices
            .iter()
            .map(|choice| {
                let available = choice.is_available(character);
                ChoiceView {
                    id: choice.id.clone(),
                    text: choice.text.clone(),
                    available,
                    condition_text: choice.condition_text.clone(),
                    attribute_changes: choice.attribute_changes.clone(),
                    failure_probability: (!available).then_some(failure_probability),
                }
            })
            .collect()
    };

    NodeView {
        id: node.id.clone(),
        text: node.text.clone(),
        kind: node.kind,
        chapter: node.chapter,
        section: node.section,
        media: node.media.clone(),
        choices,
    }
}

#[cfg(test)]
mod tests {
    use xianlu_character::{Attributes, ExperienceTable};

    use super::*;
    use crate::domain::condition::Condition;
    use crate::domain::graph::{Choice, NextNode, Node, StoryGraph};

    fn engine() -> NarrativeEngine {
        let start = Node {
            id: "start".to_owned(),
            text: "山门前".to_owned(),
            kind: NodeKind::Story,
            chapter: 1,
            section: 1,
            media: Some("gate.png".to_owned()),
            on_enter: Vec::new(),
            choices: vec![
                Choice {
                    id: "enter".to_owned(),
                    text: "入山".to_owned(),
                    condition: None,
                    condition_text: None,
                    consequence: Vec::new(),
                    next_node: NextNode::Static("end".to_owned()),
                    attribute_changes: BTreeMap::from([(AttributeKind::Luck, 1)]),
                },
                Choice {
                    id: "charm".to_owned(),
                    text: "游说守门弟子".to_owned(),
                    condition: Some(Condition::AttributeAtLeast(AttributeKind::Charm, 15)),
                    condition_text: Some("需要魅力≥15".to_owned()),
                    consequence: Vec::new(),
                    next_node: NextNode::Static("end".to_owned()),
                    attribute_changes: BTreeMap::new(),
                },
            ],
        };
        let end = Node {
            id: "end".to_owned(),
            text: "终".to_owned(),
            kind: NodeKind::Ending,
            chapter: 1,
            section: 2,
            media: None,
            on_enter: Vec::new(),
            choices: Vec::new(),
        };
        let graph = StoryGraph::new(vec![start, end], "start", "start", "end").unwrap();
        NarrativeEngine::new(graph, ExperienceTable::default())
    }

    #[test]
    fn test_view_marks_availability_and_failure_chance() {
        // Arrange
        let engine = engine();
        let character = engine.start_new_game_with(Attributes::uniform(10));

        // Act
        let view = current_node_view(&engine, &character);

        // Assert
        assert_eq!(view.id, "start");
        assert_eq!(view.media.as_deref(), Some("gate.png"));
        assert_eq!(view.choices.len(), 2);
        assert!(view.choices[0].available);
        assert_eq!(view.choices[0].failure_probability, None);
        assert!(!view.choices[1].available);
        // 90 - 40 + 0
        assert_eq!(view.choices[1].failure_probability, Some(50));
        assert_eq!(view.choices[1].condition_text.as_deref(), Some("需要魅力≥15"));
    }

    #[test]
    fn test_unknown_node_falls_back_to_root() {
        let engine = engine();
        let mut character = engine.start_new_game();
        character.current_node = "gone".to_owned();

        assert_eq!(current_node_view(&engine, &character).id, "start");
    }

    #[test]
    fn test_ended_run_has_no_choices() {
        let engine = engine();
        let mut character = engine.start_new_game();
        character.is_game_ended = true;

        assert!(current_node_view(&engine, &character).choices.is_empty());
    }
}
