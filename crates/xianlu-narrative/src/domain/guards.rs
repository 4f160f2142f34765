//! Post-resolution invariant checks driven by declarative data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use xianlu_character::Character;

use super::condition::Condition;

/// What to do when a choice would lead back to the node it was made on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfLoopPolicy {
    /// Where self-loops go instead. `None` sends them to the root node.
    #[serde(default)]
    pub redirect_to: Option<String>,
    /// Nodes that may legitimately loop onto themselves (training grounds,
    /// shops).
    #[serde(default)]
    pub exempt: BTreeSet<String>,
}

/// Once `exit_when` holds, transitions that stay inside `chapter` go to
/// `entry_node` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterGate {
    pub chapter: u32,
    pub exit_when: Condition,
    pub entry_node: String,
}

/// Why a resolved target was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GuardRedirect {
    SelfLoop { to: Option<String> },
    ChapterGate { chapter: u32, to: String },
}

impl GuardRedirect {
    /// The replacement target, if the redirect names one.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            GuardRedirect::SelfLoop { to } => to.as_deref(),
            GuardRedirect::ChapterGate { to, .. } => Some(to),
        }
    }
}

/// The full set of guards run after next-node resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantGuards {
    #[serde(default)]
    pub self_loop: SelfLoopPolicy,
    #[serde(default)]
    pub chapter_gates: Vec<ChapterGate>,
}

impl InvariantGuards {
    /// Checks the `from -> to` transition. `from_chapter`/`to_chapter` are the
    /// chapters of the two nodes.
    ///
    /// Self-loops are checked first; at most one redirect is returned.
    #[must_use]
    pub fn check(
        &self,
        from: &str,
        to: &str,
        from_chapter: u32,
        to_chapter: u32,
        character: &Character,
    ) -> Option<GuardRedirect> {
        if from == to && !self.self_loop.exempt.contains(from) {
            return Some(GuardRedirect::SelfLoop {
                to: self.self_loop.redirect_to.clone(),
            });
        }

        self.chapter_gates
            .iter()
            .find(|gate| {
                gate.chapter == from_chapter
                    && gate.chapter == to_chapter
                    && gate.entry_node != to
                    && gate.exit_when.evaluate(character)
            })
            .map(|gate| GuardRedirect::ChapterGate {
                chapter: gate.chapter,
                to: gate.entry_node.clone(),
            })
    }
}
