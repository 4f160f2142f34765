//! Xianlu — Narrative Orchestration context.
//!
//! Responsible for the story node graph, node-id resolution and migration,
//! choice gating, and the transactional choice resolution pipeline that
//! advances a character from one node to the next.

pub mod application;
pub mod domain;

pub use application::engine::NarrativeEngine;
pub use domain::transition::{RecentChanges, Transition, TransitionKind};
