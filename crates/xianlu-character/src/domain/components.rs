//! Value components that make up a character.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower bound of every attribute.
pub const ATTRIBUTE_MIN: i32 = 0;
/// Upper bound of every attribute.
pub const ATTRIBUTE_MAX: i32 = 20;
/// Highest cultivation stage within a level.
pub const MAX_STAGE: u8 = 3;

const REALM_NAMES: [&str; 10] = [
    "练气", "筑基", "金丹", "元婴", "化神", "炼虚", "合体", "大乘", "渡劫", "真仙",
];
const STAGE_NAMES: [&str; 4] = ["初期", "中期", "后期", "圆满"];

/// The five innate attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Charm,
    Comprehension,
    Constitution,
    Family,
    Luck,
}

impl AttributeKind {
    /// Every attribute, in display order.
    pub const ALL: [AttributeKind; 5] = [
        AttributeKind::Charm,
        AttributeKind::Comprehension,
        AttributeKind::Constitution,
        AttributeKind::Family,
        AttributeKind::Luck,
    ];

    /// Stable snake-case key, as used in content files and change bags.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            AttributeKind::Charm => "charm",
            AttributeKind::Comprehension => "comprehension",
            AttributeKind::Constitution => "constitution",
            AttributeKind::Family => "family",
            AttributeKind::Luck => "luck",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Innate attributes, each bounded to `[0, 20]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    pub charm: i32,
    pub comprehension: i32,
    pub constitution: i32,
    pub family: i32,
    pub luck: i32,
}

impl Attributes {
    /// All attributes set to `value` (clamped).
    #[must_use]
    pub fn uniform(value: i32) -> Self {
        let v = value.clamp(ATTRIBUTE_MIN, ATTRIBUTE_MAX);
        Self {
            charm: v,
            comprehension: v,
            constitution: v,
            family: v,
            luck: v,
        }
    }

    /// Reads one attribute.
    #[must_use]
    pub fn get(&self, kind: AttributeKind) -> i32 {
        match kind {
            AttributeKind::Charm => self.charm,
            AttributeKind::Comprehension => self.comprehension,
            AttributeKind::Constitution => self.constitution,
            AttributeKind::Family => self.family,
            AttributeKind::Luck => self.luck,
        }
    }

    /// Adds `delta` to one attribute, clamping to the legal range.
    pub fn adjust(&mut self, kind: AttributeKind, delta: i32) {
        let slot = match kind {
            AttributeKind::Charm => &mut self.charm,
            AttributeKind::Comprehension => &mut self.comprehension,
            AttributeKind::Constitution => &mut self.constitution,
            AttributeKind::Family => &mut self.family,
            AttributeKind::Luck => &mut self.luck,
        };
        *slot = slot.saturating_add(delta).clamp(ATTRIBUTE_MIN, ATTRIBUTE_MAX);
    }

    /// Re-applies the bounds to every attribute (used after loading a save).
    pub fn clamp_all(&mut self) {
        for kind in AttributeKind::ALL {
            self.adjust(kind, 0);
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::uniform(5)
    }
}

/// Spendable resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    #[serde(default)]
    pub spirit_stone: i32,
    #[serde(default)]
    pub pills: i32,
    #[serde(default)]
    pub treasures: BTreeSet<String>,
}

/// Cultivation tier: level, stage within the level, and banked experience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cultivation {
    pub level: u8,
    pub stage: u8,
    #[serde(default)]
    pub experience: u32,
}

impl Cultivation {
    /// The `(level, stage)` pair, ordered lexicographically.
    #[must_use]
    pub fn realm(&self) -> (u8, u8) {
        (self.level, self.stage)
    }

    /// True if `self` sits at a lower realm than `other`.
    #[must_use]
    pub fn is_below(&self, other: &Cultivation) -> bool {
        self.realm() < other.realm()
    }

    /// Human-readable realm name, e.g. `筑基中期`.
    #[must_use]
    pub fn realm_name(&self) -> String {
        let realm = REALM_NAMES
            .get(usize::from(self.level))
            .copied()
            .unwrap_or("未知");
        let stage = STAGE_NAMES
            .get(usize::from(self.stage))
            .copied()
            .unwrap_or("");
        format!("{realm}{stage}")
    }
}

/// Inventory categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Herbs,
    Minerals,
    BeastParts,
    Pills,
    SpecialIngredients,
}

/// Categorized item counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    #[serde(default)]
    pub herbs: BTreeMap<String, u32>,
    #[serde(default)]
    pub minerals: BTreeMap<String, u32>,
    #[serde(default)]
    pub beast_parts: BTreeMap<String, u32>,
    #[serde(default)]
    pub pills: BTreeMap<String, u32>,
    #[serde(default)]
    pub special_ingredients: BTreeMap<String, u32>,
}

impl Inventory {
    fn category(&self, category: ItemCategory) -> &BTreeMap<String, u32> {
        match category {
            ItemCategory::Herbs => &self.herbs,
            ItemCategory::Minerals => &self.minerals,
            ItemCategory::BeastParts => &self.beast_parts,
            ItemCategory::Pills => &self.pills,
            ItemCategory::SpecialIngredients => &self.special_ingredients,
        }
    }

    fn category_mut(&mut self, category: ItemCategory) -> &mut BTreeMap<String, u32> {
        match category {
            ItemCategory::Herbs => &mut self.herbs,
            ItemCategory::Minerals => &mut self.minerals,
            ItemCategory::BeastParts => &mut self.beast_parts,
            ItemCategory::Pills => &mut self.pills,
            ItemCategory::SpecialIngredients => &mut self.special_ingredients,
        }
    }

    /// Quantity held of `item` in `category`.
    #[must_use]
    pub fn quantity(&self, category: ItemCategory, item: &str) -> u32 {
        self.category(category).get(item).copied().unwrap_or(0)
    }

    /// Adds `quantity` of `item`.
    pub fn add(&mut self, category: ItemCategory, item: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let slot = self.category_mut(category).entry(item.to_owned()).or_insert(0);
        *slot = slot.saturating_add(quantity);
    }

    /// Removes up to `quantity` of `item`. Returns `false` if fewer were held.
    /// Entries that reach zero are dropped.
    pub fn remove(&mut self, category: ItemCategory, item: &str, quantity: u32) -> bool {
        let items = self.category_mut(category);
        let Some(held) = items.get_mut(item) else {
            return quantity == 0;
        };
        let enough = *held >= quantity;
        *held = held.saturating_sub(quantity);
        if *held == 0 {
            items.remove(item);
        }
        enough
    }
}

/// Equipment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
    Accessory,
}

/// Equipped items, one per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub armor: Option<String>,
    #[serde(default)]
    pub accessory: Option<String>,
}

impl Equipment {
    /// Puts `item` into `slot`, returning whatever was there before.
    pub fn equip(&mut self, slot: EquipmentSlot, item: String) -> Option<String> {
        let target = match slot {
            EquipmentSlot::Weapon => &mut self.weapon,
            EquipmentSlot::Armor => &mut self.armor,
            EquipmentSlot::Accessory => &mut self.accessory,
        };
        target.replace(item)
    }
}

/// Snapshot stamped on the character when a run ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingRecord {
    pub node_id: String,
    pub turn: u32,
    pub age: u32,
    pub cultivation: Cultivation,
    pub resources: Resources,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_adjust_clamps_both_ends() {
        let mut attrs = Attributes::uniform(10);

        attrs.adjust(AttributeKind::Luck, 50);
        attrs.adjust(AttributeKind::Charm, -50);

        assert_eq!(attrs.luck, ATTRIBUTE_MAX);
        assert_eq!(attrs.charm, ATTRIBUTE_MIN);
        assert_eq!(attrs.comprehension, 10);
    }

    #[test]
    fn test_realm_ordering_is_lexicographic() {
        let low = Cultivation { level: 1, stage: 3, experience: 90 };
        let high = Cultivation { level: 2, stage: 0, experience: 0 };

        assert!(low.is_below(&high));
        assert!(!high.is_below(&low));
        assert!(!high.is_below(&high));
    }

    #[test]
    fn test_realm_name_combines_level_and_stage() {
        let c = Cultivation { level: 1, stage: 1, experience: 0 };
        assert_eq!(c.realm_name(), "筑基中期");
    }

    #[test]
    fn test_inventory_remove_drops_empty_entries() {
        let mut inv = Inventory::default();
        inv.add(ItemCategory::Herbs, "灵芝", 2);

        assert!(inv.remove(ItemCategory::Herbs, "灵芝", 2));
        assert_eq!(inv.quantity(ItemCategory::Herbs, "灵芝"), 0);
        assert!(inv.herbs.is_empty());
    }

    #[test]
    fn test_inventory_remove_reports_shortfall() {
        let mut inv = Inventory::default();
        inv.add(ItemCategory::Minerals, "玄铁", 1);

        assert!(!inv.remove(ItemCategory::Minerals, "玄铁", 3));
        assert!(!inv.remove(ItemCategory::Minerals, "赤铜", 1));
    }

    #[test]
    fn test_equip_returns_previous_item() {
        let mut eq = Equipment::default();
        assert_eq!(eq.equip(EquipmentSlot::Weapon, "铁剑".to_owned()), None);
        assert_eq!(
            eq.equip(EquipmentSlot::Weapon, "青锋剑".to_owned()),
            Some("铁剑".to_owned())
        );
    }
}
