//! Shared test doubles for the Xianlu narrative engine.

mod clock;
mod rng;
mod store;

pub use clock::FixedClock;
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingStore, RecordingStore};
