//! Xianlu — Character State context.
//!
//! Owns the value object describing a single playthrough and the
//! cultivation progression state machine that levels it up.

pub mod domain;

pub use domain::aggregates::Character;
pub use domain::components::{
    AttributeKind, Attributes, Cultivation, EndingRecord, Equipment, EquipmentSlot, Inventory,
    ItemCategory, Resources,
};
pub use domain::progression::{ExperienceGain, ExperienceTable};
