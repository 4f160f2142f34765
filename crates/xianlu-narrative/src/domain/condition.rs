//! Declarative gating predicates over a character.

use serde::{Deserialize, Serialize};
use xianlu_character::{AttributeKind, Character, ItemCategory};

/// A predicate evaluated against the working character.
///
/// Conditions are plain data so story content stays declarative and every
/// gate is testable without running closures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    AttributeAtLeast(AttributeKind, i32),
    AttributeBelow(AttributeKind, i32),
    LevelAtLeast(u8),
    RealmAtLeast(u8, u8),
    SpiritStoneAtLeast(i32),
    PillsAtLeast(i32),
    HealthAtLeast(i32),
    AgeAtLeast(u32),
    HasTag(String),
    HasStatus(String),
    HasFlag(String),
    HasTreasure(String),
    HasItem {
        category: ItemCategory,
        item: String,
        #[serde(default = "one")]
        quantity: u32,
    },
    Visited(String),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

fn one() -> u32 {
    1
}

impl Condition {
    /// Evaluates the predicate.
    #[must_use]
    pub fn evaluate(&self, character: &Character) -> bool {
        match self {
            Condition::AttributeAtLeast(kind, min) => character.attributes.get(*kind) >= *min,
            Condition::AttributeBelow(kind, max) => character.attributes.get(*kind) < *max,
            Condition::LevelAtLeast(level) => character.cultivation.level >= *level,
            Condition::RealmAtLeast(level, stage) => {
                character.cultivation.realm() >= (*level, *stage)
            }
            Condition::SpiritStoneAtLeast(min) => character.resources.spirit_stone >= *min,
            Condition::PillsAtLeast(min) => character.resources.pills >= *min,
            Condition::HealthAtLeast(min) => character.health >= *min,
            Condition::AgeAtLeast(min) => character.age >= *min,
            Condition::HasTag(tag) => character.tags.contains(tag),
            Condition::HasStatus(status) => character.status_effects.contains(status),
            Condition::HasFlag(flag) => character.has_flag(flag),
            Condition::HasTreasure(name) => character.resources.treasures.contains(name),
            Condition::HasItem {
                category,
                item,
                quantity,
            } => character.inventory.quantity(*category, item) >= *quantity,
            Condition::Visited(node_id) => character.visited_nodes.contains(node_id),
            Condition::All(all) => all.iter().all(|c| c.evaluate(character)),
            Condition::Any(any) => any.iter().any(|c| c.evaluate(character)),
            Condition::Not(inner) => !inner.evaluate(character),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xianlu_character::Attributes;

    fn character() -> Character {
        let mut c = Character::new("start", Attributes::uniform(8));
        c.resources.spirit_stone = 120;
        c.tags.insert("剑修".to_owned());
        c.cultivation.level = 2;
        c.cultivation.stage = 1;
        c
    }

    #[test]
    fn test_attribute_thresholds() {
        let c = character();
        assert!(Condition::AttributeAtLeast(AttributeKind::Charm, 8).evaluate(&c));
        assert!(!Condition::AttributeAtLeast(AttributeKind::Charm, 9).evaluate(&c));
        assert!(Condition::AttributeBelow(AttributeKind::Luck, 9).evaluate(&c));
    }

    #[test]
    fn test_realm_comparison_is_lexicographic() {
        let c = character();
        assert!(Condition::RealmAtLeast(2, 1).evaluate(&c));
        assert!(Condition::RealmAtLeast(1, 3).evaluate(&c));
        assert!(!Condition::RealmAtLeast(2, 2).evaluate(&c));
    }

    #[test]
    fn test_combinators() {
        let c = character();
        let cond = Condition::All(vec![
            Condition::HasTag("剑修".to_owned()),
            Condition::Not(Box::new(Condition::HasFlag("拜师".to_owned()))),
            Condition::Any(vec![
                Condition::SpiritStoneAtLeast(500),
                Condition::LevelAtLeast(2),
            ]),
        ]);
        assert!(cond.evaluate(&c));
    }

    #[test]
    fn test_deserializes_from_tagged_json() {
        let cond: Condition =
            serde_json::from_str(r#"{"attribute_at_least": ["comprehension", 12]}"#).unwrap();
        assert_eq!(
            cond,
            Condition::AttributeAtLeast(AttributeKind::Comprehension, 12)
        );

        let item: Condition =
            serde_json::from_str(r#"{"has_item": {"category": "herbs", "item": "灵芝"}}"#).unwrap();
        assert!(!item.evaluate(&character()));
    }
}
