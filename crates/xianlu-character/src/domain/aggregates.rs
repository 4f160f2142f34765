//! The character aggregate: everything a single playthrough owns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::components::{
    AttributeKind, Attributes, Cultivation, EndingRecord, Equipment, Inventory, Resources,
};
use super::progression::ExperienceTable;

/// Upper bound of health.
pub const MAX_HEALTH: i32 = 100;

fn full_health() -> i32 {
    MAX_HEALTH
}

/// The mutable state of one playthrough.
///
/// Fields marked `#[serde(default)]` may be missing from older save codes and
/// are backfilled on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub attributes: Attributes,
    #[serde(default)]
    pub resources: Resources,
    pub cultivation: Cultivation,
    #[serde(default = "full_health")]
    pub health: i32,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub current_turn: u32,
    #[serde(default)]
    pub last_damage_turn: Option<u32>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub status_effects: BTreeSet<String>,
    /// Narrative history, append-only.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Discrete "this has happened" markers.
    #[serde(default)]
    pub flags: BTreeSet<String>,
    /// Levels whose breakthrough milestone has been recorded.
    #[serde(default)]
    pub milestones: BTreeSet<u8>,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub visited_nodes: BTreeSet<String>,
    #[serde(default)]
    pub claimed_achievements: BTreeSet<String>,
    #[serde(default)]
    pub ending: Option<EndingRecord>,
    #[serde(default)]
    pub is_game_ended: bool,
    #[serde(default)]
    pub current_node: String,
    /// Transition queued for the UI; never persisted.
    #[serde(skip)]
    pub pending_transition: Option<String>,
}

impl Character {
    /// Creates a fresh character standing on `start_node`.
    #[must_use]
    pub fn new(start_node: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            attributes,
            resources: Resources::default(),
            cultivation: Cultivation::default(),
            health: MAX_HEALTH,
            age: 0,
            current_turn: 0,
            last_damage_turn: None,
            tags: BTreeSet::new(),
            status_effects: BTreeSet::new(),
            choices: Vec::new(),
            flags: BTreeSet::new(),
            milestones: BTreeSet::new(),
            inventory: Inventory::default(),
            equipment: Equipment::default(),
            visited_nodes: BTreeSet::new(),
            claimed_achievements: BTreeSet::new(),
            ending: None,
            is_game_ended: false,
            current_node: start_node.into(),
            pending_transition: None,
        }
    }

    /// Check if the character is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Number of entries in the choice log.
    #[must_use]
    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    /// Adds `delta` to an attribute, clamped to `[0, 20]`.
    pub fn adjust_attribute(&mut self, kind: AttributeKind, delta: i32) {
        self.attributes.adjust(kind, delta);
    }

    /// Adds `delta` to health, clamped to `[0, 100]`. Any loss is recorded as
    /// damage taken on the current turn.
    pub fn adjust_health(&mut self, delta: i32) {
        self.health = self.health.saturating_add(delta).clamp(0, MAX_HEALTH);
        if delta < 0 {
            self.last_damage_turn = Some(self.current_turn);
        }
    }

    /// Multiplies health by `percent / 100`, rounding down.
    pub fn scale_health(&mut self, percent: u32) {
        let percent = i32::try_from(percent).unwrap_or(i32::MAX);
        let scaled = self.health.saturating_mul(percent) / 100;
        self.adjust_health(scaled - self.health);
    }

    /// Adds `delta` spirit stones, never going below zero.
    pub fn adjust_spirit_stone(&mut self, delta: i32) {
        self.resources.spirit_stone = self.resources.spirit_stone.saturating_add(delta).max(0);
    }

    /// Adds `delta` pills, never going below zero.
    pub fn adjust_pills(&mut self, delta: i32) {
        self.resources.pills = self.resources.pills.saturating_add(delta).max(0);
    }

    /// Sets an event flag. Returns `true` if it was not already set.
    pub fn set_flag(&mut self, flag: impl Into<String>) -> bool {
        self.flags.insert(flag.into())
    }

    /// Checks an event flag.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Appends an entry to the choice log.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.choices.push(entry.into());
    }

    /// Last entry in the choice log.
    #[must_use]
    pub fn last_record(&self) -> Option<&str> {
        self.choices.last().map(String::as_str)
    }

    /// Moves one cultivation stage down, dropping a level when already at the
    /// first stage.
    pub fn demote_stage(&mut self) {
        if self.cultivation.stage > 0 {
            self.cultivation.stage -= 1;
        } else if self.cultivation.level > 0 {
            self.cultivation.level -= 1;
            self.cultivation.stage = super::components::MAX_STAGE;
        }
    }

    /// Drops one full level, resetting the stage and banked experience.
    pub fn demote_level(&mut self) {
        self.cultivation.level = self.cultivation.level.saturating_sub(1);
        self.cultivation.stage = 0;
        self.cultivation.experience = 0;
    }

    /// Re-applies every bound: attributes, health, non-negative resources and
    /// cultivation within `table`.
    pub fn clamp_to(&mut self, table: &ExperienceTable) {
        self.attributes.clamp_all();
        self.health = self.health.clamp(0, MAX_HEALTH);
        self.resources.spirit_stone = self.resources.spirit_stone.max(0);
        self.resources.pills = self.resources.pills.max(0);
        table.clamp(&mut self.cultivation);
    }

    /// Removes about half of the treasures, always keeping at least one.
    /// Returns the names of the treasures lost.
    pub fn lose_treasures(&mut self, keep_at_least: usize) -> Vec<String> {
        let held = self.resources.treasures.len();
        let to_lose = (held / 2).min(held.saturating_sub(keep_at_least.max(1)));
        let lost: Vec<String> = self
            .resources
            .treasures
            .iter()
            .rev()
            .take(to_lose)
            .cloned()
            .collect();
        for name in &lost {
            self.resources.treasures.remove(name);
        }
        lost
    }
}
