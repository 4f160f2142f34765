//! Declarative character mutations.
//!
//! A choice's consequence, a node's arrival effects and every penalty are
//! lists of `Effect`s applied in order to the working copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xianlu_character::domain::components::MAX_STAGE;
use xianlu_character::{AttributeKind, Character, Cultivation, EquipmentSlot, ItemCategory};

/// One mutation of the working character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    AdjustAttribute(AttributeKind, i32),
    AdjustHealth(i32),
    /// Multiplies health by the given percentage.
    ScaleHealth(u32),
    AdjustSpiritStone(i32),
    AdjustPills(i32),
    GainTreasure(String),
    /// Loses about half the treasures, keeping at least one.
    LoseTreasures,
    AddTag(String),
    RemoveTag(String),
    AddStatus(String),
    RemoveStatus(String),
    SetFlag(String),
    /// Base experience, before the comprehension bonus.
    GainExperience(u32),
    AdvanceStage,
    DemoteStage,
    DemoteLevel,
    /// Explicit cultivation reset; the only effect allowed to lower the realm
    /// on an ordinary transition.
    Reincarnate,
    AgeYears(u32),
    AddItem {
        category: ItemCategory,
        item: String,
        quantity: u32,
    },
    RemoveItem {
        category: ItemCategory,
        item: String,
        quantity: u32,
    },
    Equip {
        slot: EquipmentSlot,
        item: String,
    },
}

/// Aggregate result of applying a list of effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedEffects {
    /// Base experience to feed into the progression engine.
    pub experience: u32,
    /// Whether an explicit reset was among the effects.
    pub resets_cultivation: bool,
}

impl Effect {
    /// Applies this effect to `character`.
    ///
    /// Experience is not credited here; it is accumulated by [`apply_all`] and
    /// handed to the progression engine so breakthroughs run exactly once.
    pub fn apply(&self, character: &mut Character) {
        match self {
            Effect::AdjustAttribute(kind, delta) => character.adjust_attribute(*kind, *delta),
            Effect::AdjustHealth(delta) => character.adjust_health(*delta),
            Effect::ScaleHealth(percent) => character.scale_health(*percent),
            Effect::AdjustSpiritStone(delta) => character.adjust_spirit_stone(*delta),
            Effect::AdjustPills(delta) => character.adjust_pills(*delta),
            Effect::GainTreasure(name) => {
                character.resources.treasures.insert(name.clone());
            }
            Effect::LoseTreasures => {
                character.lose_treasures(1);
            }
            Effect::AddTag(tag) => {
                character.tags.insert(tag.clone());
            }
            Effect::RemoveTag(tag) => {
                character.tags.remove(tag);
            }
            Effect::AddStatus(status) => {
                character.status_effects.insert(status.clone());
            }
            Effect::RemoveStatus(status) => {
                character.status_effects.remove(status);
            }
            Effect::SetFlag(flag) => {
                character.set_flag(flag.clone());
            }
            Effect::GainExperience(_) => {}
            Effect::AdvanceStage => {
                let stage = &mut character.cultivation.stage;
                *stage = (*stage + 1).min(MAX_STAGE);
            }
            Effect::DemoteStage => character.demote_stage(),
            Effect::DemoteLevel => character.demote_level(),
            Effect::Reincarnate => character.cultivation = Cultivation::default(),
            Effect::AgeYears(years) => character.age = character.age.saturating_add(*years),
            Effect::AddItem {
                category,
                item,
                quantity,
            } => character.inventory.add(*category, item, *quantity),
            Effect::RemoveItem {
                category,
                item,
                quantity,
            } => {
                character.inventory.remove(*category, item, *quantity);
            }
            Effect::Equip { slot, item } => {
                character.equipment.equip(*slot, item.clone());
            }
        }
    }
}

/// Applies `effects` in order.
pub fn apply_all(effects: &[Effect], character: &mut Character) -> AppliedEffects {
    let mut applied = AppliedEffects::default();
    for effect in effects {
        match effect {
            Effect::GainExperience(base) => {
                applied.experience = applied.experience.saturating_add(*base);
            }
            Effect::Reincarnate => applied.resets_cultivation = true,
            _ => {}
        }
        effect.apply(character);
    }
    applied
}

/// Net attribute deltas declared by a list of effects.
#[must_use]
pub fn attribute_deltas(effects: &[Effect]) -> BTreeMap<AttributeKind, i32> {
    let mut deltas = BTreeMap::new();
    for effect in effects {
        if let Effect::AdjustAttribute(kind, delta) = effect {
            *deltas.entry(*kind).or_insert(0) += delta;
        }
    }
    deltas.retain(|_, delta| *delta != 0);
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use xianlu_character::Attributes;

    fn character() -> Character {
        Character::new("start", Attributes::uniform(10))
    }

    #[test]
    fn test_apply_all_accumulates_experience_without_crediting_it() {
        let mut c = character();
        let applied = apply_all(
            &[
                Effect::GainExperience(30),
                Effect::AdjustAttribute(AttributeKind::Luck, 2),
                Effect::GainExperience(15),
            ],
            &mut c,
        );

        assert_eq!(applied.experience, 45);
        assert!(!applied.resets_cultivation);
        assert_eq!(c.cultivation.experience, 0);
        assert_eq!(c.attributes.luck, 12);
    }

    #[test]
    fn test_reincarnate_is_reported() {
        let mut c = character();
        c.cultivation.level = 4;

        let applied = apply_all(&[Effect::Reincarnate], &mut c);

        assert!(applied.resets_cultivation);
        assert_eq!(c.cultivation.realm(), (0, 0));
    }

    #[test]
    fn test_advance_stage_caps_at_max() {
        let mut c = character();
        for _ in 0..6 {
            Effect::AdvanceStage.apply(&mut c);
        }
        assert_eq!(c.cultivation.stage, MAX_STAGE);
    }

    #[test]
    fn test_inventory_effects() {
        let mut c = character();
        apply_all(
            &[
                Effect::AddItem {
                    category: ItemCategory::Herbs,
                    item: "灵芝".to_owned(),
                    quantity: 3,
                },
                Effect::RemoveItem {
                    category: ItemCategory::Herbs,
                    item: "灵芝".to_owned(),
                    quantity: 1,
                },
            ],
            &mut c,
        );
        assert_eq!(c.inventory.quantity(ItemCategory::Herbs, "灵芝"), 2);
    }

    #[test]
    fn test_attribute_deltas_sums_and_drops_zero() {
        let deltas = attribute_deltas(&[
            Effect::AdjustAttribute(AttributeKind::Charm, 2),
            Effect::AdjustAttribute(AttributeKind::Charm, 1),
            Effect::AdjustAttribute(AttributeKind::Luck, 1),
            Effect::AdjustAttribute(AttributeKind::Luck, -1),
        ]);
        assert_eq!(deltas.get(&AttributeKind::Charm), Some(&3));
        assert!(!deltas.contains_key(&AttributeKind::Luck));
    }

    #[test]
    fn test_unit_variant_deserializes_from_string() {
        let effect: Effect = serde_json::from_str(r#""lose_treasures""#).unwrap();
        assert_eq!(effect, Effect::LoseTreasures);
    }
}
