//! Severity-weighted penalties for failed forced choices.

use serde::Serialize;
use xianlu_character::AttributeKind;
use xianlu_core::rng::DeterministicRng;

use super::effect::Effect;

/// Which attribute family a gating condition tests, inferred from its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyCategory {
    Charm,
    Comprehension,
    Constitution,
    Family,
    Luck,
    Cultivation,
    Generic,
}

const KEYWORDS: [(PenaltyCategory, &[&str]); 6] = [
    (PenaltyCategory::Charm, &["魅力", "charm"]),
    (PenaltyCategory::Comprehension, &["悟性", "comprehension"]),
    (PenaltyCategory::Constitution, &["体质", "constitution"]),
    (PenaltyCategory::Family, &["家境", "家世", "family"]),
    (PenaltyCategory::Luck, &["气运", "运气", "luck"]),
    (PenaltyCategory::Cultivation, &["境界", "修为", "cultivation", "realm"]),
];

impl PenaltyCategory {
    /// Picks the category by the first keyword found in `condition_text`.
    #[must_use]
    pub fn classify(condition_text: Option<&str>) -> Self {
        let Some(text) = condition_text else {
            return PenaltyCategory::Generic;
        };
        let lowered = text.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
            .map_or(PenaltyCategory::Generic, |(category, _)| *category)
    }
}

/// Penalty band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Mid,
    High,
}

impl Severity {
    /// Buckets a uniform draw in `[0, 100)` into thirds.
    #[must_use]
    pub fn from_roll(roll: u32) -> Self {
        match roll {
            0..=32 => Severity::Low,
            33..=65 => Severity::Mid,
            _ => Severity::High,
        }
    }
}

/// A concrete penalty ready to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Penalty {
    pub category: PenaltyCategory,
    pub severity: Severity,
    pub effects: Vec<Effect>,
    /// Whether this penalty may kill. Non-lethal penalties leave at least one
    /// point of health.
    pub lethal: bool,
}

fn status(name: &str) -> Effect {
    Effect::AddStatus(name.to_owned())
}

fn attr(kind: AttributeKind, delta: i32) -> Effect {
    Effect::AdjustAttribute(kind, delta)
}

/// Builds the penalty for `category` at `severity`.
///
/// Some rows draw extra random numbers (amounts, which attribute); those
/// draws happen here, after the severity draw.
#[allow(clippy::too_many_lines)]
pub fn penalty_for(
    category: PenaltyCategory,
    severity: Severity,
    rng: &mut dyn DeterministicRng,
) -> Penalty {
    use AttributeKind::{Charm, Comprehension, Constitution, Family, Luck};
    use Severity::{High, Low, Mid};

    let mut lethal = false;
    let effects = match (category, severity) {
        (PenaltyCategory::Charm, Low) => vec![attr(Charm, -2), attr(Luck, -1), status("社交障碍")],
        (PenaltyCategory::Charm, Mid) => vec![attr(Charm, -2), Effect::AdjustSpiritStone(-30)],
        (PenaltyCategory::Charm, High) => vec![attr(Charm, -3), status("声名狼藉")],

        (PenaltyCategory::Comprehension, Low) => vec![attr(Comprehension, -2), status("思维混乱")],
        (PenaltyCategory::Comprehension, Mid) => {
            vec![attr(Comprehension, -2), Effect::AdjustHealth(-20)]
        }
        (PenaltyCategory::Comprehension, High) => {
            vec![attr(Comprehension, -3), status("走火入魔")]
        }

        (PenaltyCategory::Constitution, Low) => vec![
            attr(Constitution, -2),
            status("元气大伤"),
            Effect::ScaleHealth(80),
        ],
        (PenaltyCategory::Constitution, Mid) => {
            lethal = true;
            vec![attr(Constitution, -2), Effect::AdjustHealth(-30)]
        }
        (PenaltyCategory::Constitution, High) => vec![
            attr(Constitution, -3),
            Effect::AdjustHealth(-40),
            status("重伤未愈"),
        ],

        (PenaltyCategory::Family, Low | Mid) => {
            let amount = rng.next_u32_range(50, 80);
            vec![
                Effect::AdjustSpiritStone(-i32::try_from(amount).unwrap_or(80)),
                status("债台高筑"),
            ]
        }
        (PenaltyCategory::Family, High) => vec![
            attr(Family, -1),
            Effect::AdjustSpiritStone(-50),
            status("家族蒙羞"),
        ],

        (PenaltyCategory::Luck, Low) => vec![attr(Luck, -2), status("因果纠缠")],
        (PenaltyCategory::Luck, Mid) => vec![attr(Luck, -3), Effect::LoseTreasures],
        (PenaltyCategory::Luck, High) => {
            let loss = if rng.next_u32_range(0, 1) == 0 { 3 } else { 4 };
            vec![attr(Luck, -loss), status("霉运缠身")]
        }

        (PenaltyCategory::Cultivation, Low) => vec![Effect::DemoteLevel, status("修为尽失")],
        (PenaltyCategory::Cultivation, Mid) => {
            lethal = true;
            vec![Effect::DemoteStage, Effect::AdjustHealth(-40)]
        }
        (PenaltyCategory::Cultivation, High) => vec![
            Effect::DemoteStage,
            Effect::AdjustHealth(-40),
            status("道心受损"),
        ],

        (PenaltyCategory::Generic, Low) => {
            let index = rng.next_u32_range(0, 4) as usize;
            let kind = AttributeKind::ALL[index.min(AttributeKind::ALL.len() - 1)];
            vec![attr(kind, -2), Effect::AdjustHealth(-15)]
        }
        (PenaltyCategory::Generic, Mid) => vec![status("厄运缠身")],
        (PenaltyCategory::Generic, High) => {
            let damage = if rng.next_u32_range(0, 1) == 0 { 15 } else { 25 };
            vec![
                Effect::AdjustHealth(-damage),
                attr(Luck, -1),
                status("身心俱疲"),
            ]
        }
    };

    Penalty {
        category,
        severity,
        effects,
        lethal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xianlu_test_support::{MockRng, SequenceRng};

    #[test]
    fn test_classify_by_keyword() {
        assert_eq!(
            PenaltyCategory::classify(Some("需要魅力≥12")),
            PenaltyCategory::Charm
        );
        assert_eq!(
            PenaltyCategory::classify(Some("需要筑基境界")),
            PenaltyCategory::Cultivation
        );
        assert_eq!(
            PenaltyCategory::classify(Some("Requires LUCK 15")),
            PenaltyCategory::Luck
        );
        assert_eq!(
            PenaltyCategory::classify(Some("需要一把钥匙")),
            PenaltyCategory::Generic
        );
        assert_eq!(PenaltyCategory::classify(None), PenaltyCategory::Generic);
    }

    #[test]
    fn test_severity_bands_cover_range() {
        assert_eq!(Severity::from_roll(0), Severity::Low);
        assert_eq!(Severity::from_roll(32), Severity::Low);
        assert_eq!(Severity::from_roll(33), Severity::Mid);
        assert_eq!(Severity::from_roll(65), Severity::Mid);
        assert_eq!(Severity::from_roll(66), Severity::High);
        assert_eq!(Severity::from_roll(99), Severity::High);
    }

    #[test]
    fn test_only_mid_constitution_and_cultivation_are_lethal() {
        let categories = [
            PenaltyCategory::Charm,
            PenaltyCategory::Comprehension,
            PenaltyCategory::Constitution,
            PenaltyCategory::Family,
            PenaltyCategory::Luck,
            PenaltyCategory::Cultivation,
            PenaltyCategory::Generic,
        ];
        for category in categories {
            for severity in [Severity::Low, Severity::Mid, Severity::High] {
                let penalty = penalty_for(category, severity, &mut MockRng);
                let expected = severity == Severity::Mid
                    && matches!(
                        category,
                        PenaltyCategory::Constitution | PenaltyCategory::Cultivation
                    );
                assert_eq!(penalty.lethal, expected, "{category:?}/{severity:?}");
                assert!(!penalty.effects.is_empty());
            }
        }
    }

    #[test]
    fn test_family_low_draws_amount() {
        let mut rng = SequenceRng::new(vec![72]);

        let penalty = penalty_for(PenaltyCategory::Family, Severity::Low, &mut rng);

        assert_eq!(penalty.effects[0], Effect::AdjustSpiritStone(-72));
        assert_eq!(penalty.effects[1], Effect::AddStatus("债台高筑".to_owned()));
    }

    #[test]
    fn test_generic_low_picks_attribute_from_draw() {
        let mut rng = SequenceRng::new(vec![4]);

        let penalty = penalty_for(PenaltyCategory::Generic, Severity::Low, &mut rng);

        assert_eq!(
            penalty.effects,
            vec![
                Effect::AdjustAttribute(AttributeKind::Luck, -2),
                Effect::AdjustHealth(-15)
            ]
        );
    }
}
