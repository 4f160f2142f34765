//! Weighted, once-only late-game events that override the next node.

use serde::{Deserialize, Serialize};
use xianlu_character::Character;
use xianlu_core::rng::DeterministicRng;

fn default_weight() -> u32 {
    1
}

/// One late-game event and its eligibility thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateEvent {
    pub id: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub min_level: u8,
    #[serde(default)]
    pub min_spirit_stone: i32,
    #[serde(default)]
    pub min_pills: i32,
    /// Node the event sends the player to.
    pub node: String,
}

impl LateEvent {
    /// Flag recorded once the event has fired.
    #[must_use]
    pub fn flag(&self) -> String {
        LateEventTable::flag_for(&self.id)
    }

    /// Whether `character` meets the thresholds and has not seen this event.
    #[must_use]
    pub fn is_eligible(&self, character: &Character) -> bool {
        self.weight > 0
            && character.cultivation.level >= self.min_level
            && character.resources.spirit_stone >= self.min_spirit_stone
            && character.resources.pills >= self.min_pills
            && !character.has_flag(&self.flag())
    }
}

/// The late-game event table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateEventTable {
    /// Chance, in percent, that any event fires on a given turn.
    #[serde(default)]
    pub chance_percent: u32,
    #[serde(default)]
    pub events: Vec<LateEvent>,
}

impl LateEventTable {
    /// The once-only flag for event `id`.
    #[must_use]
    pub fn flag_for(id: &str) -> String {
        format!("late_event:{id}")
    }

    /// Events `character` is currently eligible for.
    pub fn eligible<'a>(
        &'a self,
        character: &Character,
    ) -> impl Iterator<Item = &'a LateEvent> {
        self.events.iter().filter(|e| e.is_eligible(character))
    }

    /// Rolls for an event.
    ///
    /// Draws the chance roll first and, only when it hits and something is
    /// eligible, a second weighted pick.
    pub fn draw(
        &self,
        character: &Character,
        rng: &mut dyn DeterministicRng,
    ) -> Option<&LateEvent> {
        if self.chance_percent == 0 || self.events.is_empty() {
            return None;
        }
        if rng.next_u32_range(0, 99) >= self.chance_percent {
            return None;
        }

        let eligible: Vec<&LateEvent> = self.eligible(character).collect();
        let total = eligible
            .iter()
            .fold(0_u32, |total, event| total.saturating_add(event.weight));
        if total == 0 {
            return None;
        }

        let mut pick = rng.next_u32_range(0, total - 1);
        for event in eligible {
            if pick < event.weight {
                return Some(event);
            }
            pick -= event.weight;
        }
        None
    }
}
