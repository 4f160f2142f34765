//! Tunable engine parameters.

use serde::{Deserialize, Serialize};
use xianlu_character::Attributes;

fn default_starting_age() -> u32 {
    16
}

fn default_spirit_stone_per_family() -> i32 {
    10
}

fn default_quiet_turns() -> u32 {
    2
}

fn default_regeneration_percent() -> u32 {
    50
}

fn default_ending_age_bonus() -> u32 {
    5
}

/// Engine parameters. Every field has a default so a story bundle may omit
/// the whole section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub starting_attributes: Attributes,
    #[serde(default = "default_starting_age")]
    pub starting_age: u32,
    /// Spirit stones granted per point of family at the start of a run.
    #[serde(default = "default_spirit_stone_per_family")]
    pub spirit_stone_per_family: i32,
    /// Turns without damage before passive regeneration kicks in.
    #[serde(default = "default_quiet_turns")]
    pub regeneration_quiet_turns: u32,
    /// Percentage of constitution healed per regenerating turn.
    #[serde(default = "default_regeneration_percent")]
    pub regeneration_percent: u32,
    /// Years added to the character's age when a run ends.
    #[serde(default = "default_ending_age_bonus")]
    pub ending_age_bonus: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_attributes: Attributes::default(),
            starting_age: default_starting_age(),
            spirit_stone_per_family: default_spirit_stone_per_family(),
            regeneration_quiet_turns: default_quiet_turns(),
            regeneration_percent: default_regeneration_percent(),
            ending_age_bonus: default_ending_age_bonus(),
        }
    }
}

impl EngineConfig {
    /// Health restored by one regenerating turn.
    #[must_use]
    pub fn regeneration_amount(&self, constitution: i32) -> i32 {
        let percent = i32::try_from(self.regeneration_percent).unwrap_or(0);
        constitution.max(0).saturating_mul(percent) / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_section_uses_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.starting_age, 16);
    }

    #[test]
    fn test_regeneration_is_half_constitution_rounded_down() {
        let config = EngineConfig::default();
        assert_eq!(config.regeneration_amount(9), 4);
        assert_eq!(config.regeneration_amount(20), 10);
        assert_eq!(config.regeneration_amount(0), 0);
    }
}
