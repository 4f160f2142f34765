//! Story node graph: nodes, choices and next-node resolution data.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use xianlu_character::{AttributeKind, Character};
use xianlu_core::error::DomainError;

use super::condition::Condition;
use super::effect::Effect;

/// Role a node plays in the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Story,
    /// Where a failed forced choice lands.
    Failure,
    /// Terminal; arriving here ends the run.
    Ending,
}

/// A narrative unit with text and outgoing choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub chapter: u32,
    #[serde(default)]
    pub section: u32,
    /// Media reference handed through to the renderer untouched.
    #[serde(default)]
    pub media: Option<String>,
    /// Applied on the first arrival only.
    #[serde(default)]
    pub on_enter: Vec<Effect>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Node {
    /// Finds an outgoing choice by id.
    #[must_use]
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }

    /// True for ending-class nodes.
    #[must_use]
    pub fn is_ending(&self) -> bool {
        self.kind == NodeKind::Ending
    }
}

/// A gated, mutating edge from a node to a next node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    /// Shown to the player; its keywords also select the penalty category.
    #[serde(default)]
    pub condition_text: Option<String>,
    /// Authoritative mutation.
    #[serde(default)]
    pub consequence: Vec<Effect>,
    pub next_node: NextNode,
    /// Display-only descriptor. Not reconciled with `consequence`.
    #[serde(default)]
    pub attribute_changes: BTreeMap<AttributeKind, i32>,
}

impl Choice {
    /// Whether the consequence explicitly resets cultivation.
    #[must_use]
    pub fn resets_cultivation(&self) -> bool {
        self.consequence.contains(&Effect::Reincarnate)
    }

    /// Whether the gating condition (if any) currently holds.
    #[must_use]
    pub fn is_available(&self, character: &Character) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.evaluate(character))
    }
}

/// Where a choice leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NextNode {
    Static(String),
    Computed(DecisionTable),
}

impl NextNode {
    /// Resolves the target node id for `character`.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if a computed table yields no usable target.
    pub fn resolve(&self, character: &Character) -> Result<String, ResolutionError> {
        match self {
            NextNode::Static(id) if id.trim().is_empty() => Err(ResolutionError::EmptyTarget),
            NextNode::Static(id) => Ok(id.clone()),
            NextNode::Computed(table) => table.resolve(character),
        }
    }

    /// Every node id this edge can lead to.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        match self {
            NextNode::Static(id) => vec![id.as_str()],
            NextNode::Computed(table) => table
                .rules
                .iter()
                .map(|r| r.goto.as_str())
                .chain(table.default.as_deref())
                .collect(),
        }
    }
}

/// Ordered decision rules; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTable {
    pub rules: Vec<DecisionRule>,
    #[serde(default)]
    pub default: Option<String>,
}

/// One row of a decision table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRule {
    pub when: Condition,
    pub goto: String,
}

impl DecisionTable {
    /// Picks the first rule whose condition holds, else the default.
    ///
    /// # Errors
    ///
    /// `NoMatchingRule` if nothing matches and there is no default;
    /// `EmptyTarget` if the chosen target is blank.
    pub fn resolve(&self, character: &Character) -> Result<String, ResolutionError> {
        let target = self
            .rules
            .iter()
            .find(|rule| rule.when.evaluate(character))
            .map(|rule| rule.goto.as_str())
            .or(self.default.as_deref())
            .ok_or(ResolutionError::NoMatchingRule)?;
        if target.trim().is_empty() {
            return Err(ResolutionError::EmptyTarget);
        }
        Ok(target.to_owned())
    }
}

/// Why a next-node resolution produced no target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no decision rule matched and no default target is set")]
    NoMatchingRule,
    #[error("resolved target id is empty")]
    EmptyTarget,
}

/// Static map of node id to node, with guaranteed root, failure and death
/// ending nodes.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    root: usize,
    failure: usize,
    death: usize,
}

impl StoryGraph {
    /// Builds a graph.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on duplicate node ids, a missing
    /// root/failure/death node, or a death node that is not ending-class.
    pub fn new(
        nodes: Vec<Node>,
        root_id: &str,
        failure_id: &str,
        death_id: &str,
    ) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), position).is_some() {
                return Err(DomainError::Validation(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
        }

        let find = |id: &str, role: &str| {
            index.get(id).copied().ok_or_else(|| {
                DomainError::Validation(format!("{role} node '{id}' is not in the graph"))
            })
        };
        let root = find(root_id, "root")?;
        let failure = find(failure_id, "failure")?;
        let death = find(death_id, "death")?;

        if !nodes[death].is_ending() {
            return Err(DomainError::Validation(format!(
                "death node '{death_id}' must be an ending node"
            )));
        }

        Ok(Self {
            nodes,
            index,
            root,
            failure,
            death,
        })
    }

    /// Direct lookup by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Whether `id` names a node directly.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The designated root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// The node failed forced choices lead to.
    #[must_use]
    pub fn failure_node(&self) -> &Node {
        &self.nodes[self.failure]
    }

    /// The ending reached when health drops to zero.
    #[must_use]
    pub fn death_node(&self) -> &Node {
        &self.nodes[self.death]
    }

    /// All nodes, in authoring order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes (never true for a constructed graph).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
