//! Cultivation progression state machine.
//!
//! Experience drives `(level, stage)` transitions: each time banked
//! experience crosses the requirement for the current level the character
//! breaks through to the next level at stage zero.

use serde::{Deserialize, Serialize};
use tracing::debug;
use xianlu_core::error::DomainError;

use super::aggregates::Character;
use super::components::{ATTRIBUTE_MAX, Cultivation, MAX_STAGE};

/// Experience required to leave each level, indexed by level.
///
/// The last index is the maximum level; its entry is the experience cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct ExperienceTable {
    required: Vec<u32>,
}

impl ExperienceTable {
    /// Builds a table from per-level requirements.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the table is empty, has more than
    /// ten levels, or contains a zero requirement.
    pub fn new(required: Vec<u32>) -> Result<Self, DomainError> {
        if required.is_empty() || required.len() > 10 {
            return Err(DomainError::Validation(format!(
                "experience table must have 1..=10 levels, got {}",
                required.len()
            )));
        }
        if let Some(level) = required.iter().position(|r| *r == 0) {
            return Err(DomainError::Validation(format!(
                "experience requirement for level {level} must be positive"
            )));
        }
        Ok(Self { required })
    }

    /// Highest reachable level.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_level(&self) -> u8 {
        // Bounded by the constructor to at most ten entries.
        (self.required.len() - 1) as u8
    }

    /// Experience required to leave `level` (the cap, at max level).
    #[must_use]
    pub fn required_for(&self, level: u8) -> u32 {
        let index = usize::from(level.min(self.max_level()));
        self.required[index]
    }

    /// Pulls `cultivation` back inside this table: level at most the max
    /// level, stage at most [`MAX_STAGE`], experience below the level's
    /// requirement (at most the cap at max level).
    pub fn clamp(&self, cultivation: &mut Cultivation) {
        let max_level = self.max_level();
        cultivation.level = cultivation.level.min(max_level);
        cultivation.stage = cultivation.stage.min(MAX_STAGE);
        let required = self.required_for(cultivation.level);
        let ceiling = if cultivation.level == max_level {
            required
        } else {
            required - 1
        };
        cultivation.experience = cultivation.experience.min(ceiling);
    }
}

impl Default for ExperienceTable {
    fn default() -> Self {
        Self {
            required: vec![100, 200, 400, 700, 1100, 1600, 2200, 3000, 4000, 5000],
        }
    }
}

impl TryFrom<Vec<u32>> for ExperienceTable {
    type Error = DomainError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExperienceTable> for Vec<u32> {
    fn from(table: ExperienceTable) -> Self {
        table.required
    }
}

/// What a single experience award did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExperienceGain {
    /// Experience granted before the comprehension bonus.
    pub base: u32,
    /// `floor(base * comprehension / 20)`.
    pub bonus: u32,
    /// Levels reached by this award, in order.
    pub breakthroughs: Vec<u8>,
    /// Levels whose milestone was recorded for the first time.
    pub new_milestones: Vec<u8>,
}

impl ExperienceGain {
    /// Total experience credited.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.base + self.bonus
    }
}

/// Awards `base` experience to `character`, running breakthroughs as needed.
#[allow(clippy::cast_sign_loss)]
pub fn gain_experience(character: &mut Character, base: u32, table: &ExperienceTable) -> ExperienceGain {
    let comprehension = character.attributes.comprehension.clamp(0, ATTRIBUTE_MAX) as u32;
    let bonus = base.saturating_mul(comprehension) / 20;
    let mut gain = ExperienceGain {
        base,
        bonus,
        ..ExperienceGain::default()
    };

    let cultivation = &mut character.cultivation;
    let mut total = cultivation.experience.saturating_add(gain.total());
    let max_level = table.max_level();

    while cultivation.level < max_level && total >= table.required_for(cultivation.level) {
        total -= table.required_for(cultivation.level);
        cultivation.level += 1;
        cultivation.stage = 0;
        gain.breakthroughs.push(cultivation.level);
        if character.milestones.insert(cultivation.level) {
            gain.new_milestones.push(cultivation.level);
        }
        debug!(level = cultivation.level, "breakthrough");
    }

    if cultivation.level >= max_level {
        total = total.min(table.required_for(max_level));
    }
    cultivation.experience = total;

    gain
}
