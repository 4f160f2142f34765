//! Probabilistic override of unmet choice conditions.

use serde::Serialize;
use xianlu_character::domain::components::{ATTRIBUTE_MAX, ATTRIBUTE_MIN};
use xianlu_core::rng::DeterministicRng;

/// Lowest possible failure chance, in percent.
pub const MIN_FAILURE_PROBABILITY: i32 = 10;
/// Highest possible failure chance, in percent.
pub const MAX_FAILURE_PROBABILITY: i32 = 90;

/// Extra failure chance that grows with the length of the run.
#[must_use]
pub fn difficulty_bonus(choice_count: usize) -> i32 {
    let steps = i32::try_from(choice_count / 5).unwrap_or(i32::MAX);
    steps.saturating_mul(5).min(20)
}

/// Chance, in percent, that forcing an unmet choice fails.
#[must_use]
pub fn failure_probability(luck: i32, choice_count: usize) -> u32 {
    let luck = luck.clamp(ATTRIBUTE_MIN, ATTRIBUTE_MAX);
    let raw = MAX_FAILURE_PROBABILITY - luck * 4 + difficulty_bonus(choice_count);
    raw.clamp(MIN_FAILURE_PROBABILITY, MAX_FAILURE_PROBABILITY)
        .unsigned_abs()
}

/// The outcome of one forced-choice roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateRoll {
    pub failure_probability: u32,
    pub roll: u32,
    pub passed: bool,
}

/// Draws `r` in `[0, 100)`; the override succeeds iff `r >= failure_probability`.
pub fn roll_forced_choice(
    luck: i32,
    choice_count: usize,
    rng: &mut dyn DeterministicRng,
) -> GateRoll {
    let failure_probability = failure_probability(luck, choice_count);
    let roll = rng.next_u32_range(0, 99);
    GateRoll {
        failure_probability,
        roll,
        passed: roll >= failure_probability,
    }
}
