//! The result of one `make_choice` call.

use std::collections::BTreeMap;

use serde::Serialize;
use xianlu_character::{AttributeKind, Character, ExperienceGain};

use super::gating::GateRoll;
use super::guards::GuardRedirect;
use super::penalty::{Penalty, PenaltyCategory, Severity};

/// Why a choice was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    MissingNode,
    MissingChoice,
    GameEnded,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCause {
    Died,
    Ending,
}

/// Outcome of a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionKind {
    /// Nothing happened; the character is unchanged.
    Ignored { reason: IgnoreReason },
    Advanced { from: String, to: String },
    /// A forced choice failed its roll and the penalty was applied.
    ForcedFailure {
        from: String,
        to: String,
        category: PenaltyCategory,
        severity: Severity,
    },
    /// The run is over.
    Ended { to: String, cause: EndCause },
}

/// A recovered fault encountered while resolving a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The decision table produced no target; the root node was used.
    NextNodeResolution { choice_id: String, message: String },
    /// The target id resolved neither directly nor by migration.
    UnknownTarget { target: String },
    /// A guard or late event named a node that does not exist.
    UnknownRedirect { target: String },
}

/// Everything a transition changed, for the UI to highlight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChanges {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<AttributeKind, i32>,
    pub health: i32,
    pub spirit_stone: i32,
    pub pills: i32,
    pub experience_gained: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breakthroughs: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statuses_added: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statuses_removed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub treasures_gained: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub treasures_lost: Vec<String>,
    /// Present when the choice's condition was unmet and a roll was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced: Option<GateRoll>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<Penalty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<GuardRedirect>,
    /// Health restored by passive regeneration.
    pub regenerated: i32,
}

impl RecentChanges {
    /// Folds an experience award in.
    pub fn record_gain(&mut self, gain: &ExperienceGain) {
        self.experience_gained = self.experience_gained.saturating_add(gain.total());
        self.breakthroughs.extend_from_slice(&gain.breakthroughs);
    }

    /// Fills the numeric and set deltas between `before` and `after`.
    pub fn diff(&mut self, before: &Character, after: &Character) {
        self.attributes = AttributeKind::ALL
            .into_iter()
            .map(|kind| (kind, after.attributes.get(kind) - before.attributes.get(kind)))
            .filter(|(_, delta)| *delta != 0)
            .collect();
        self.health = after.health - before.health;
        self.spirit_stone = after.resources.spirit_stone - before.resources.spirit_stone;
        self.pills = after.resources.pills - before.resources.pills;
        self.statuses_added = after
            .status_effects
            .difference(&before.status_effects)
            .cloned()
            .collect();
        self.statuses_removed = before
            .status_effects
            .difference(&after.status_effects)
            .cloned()
            .collect();
        self.treasures_gained = after
            .resources
            .treasures
            .difference(&before.resources.treasures)
            .cloned()
            .collect();
        self.treasures_lost = before
            .resources
            .treasures
            .difference(&after.resources.treasures)
            .cloned()
            .collect();
    }

    /// True when nothing worth showing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The result of one choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    #[serde(flatten)]
    pub kind: TransitionKind,
    /// The committed character, or `None` when the choice was ignored.
    #[serde(skip)]
    pub character: Option<Character>,
    pub changes: RecentChanges,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Transition {
    /// A no-op transition.
    #[must_use]
    pub fn ignored(reason: IgnoreReason) -> Self {
        Self {
            kind: TransitionKind::Ignored { reason },
            character: None,
            changes: RecentChanges::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Whether the choice was acted on.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self.kind, TransitionKind::Ignored { .. })
    }

    /// Whether this transition ended the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TransitionKind::Ended { .. })
    }
}
