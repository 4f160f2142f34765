//! State-changed signal and version tokens.

use serde::{Deserialize, Serialize};

/// Monotonic token identifying one committed game state.
///
/// Delayed effects capture the token current at scheduling time and are
/// discarded if a newer state has been committed since.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateVersion(pub u64);

impl StateVersion {
    /// Returns the token following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Receives a content-free notification after every committed state change.
///
/// Observers read whatever projection they need through the session; the
/// signal itself carries nothing but the new version.
pub trait StateObserver: Send + Sync {
    /// Called once per committed state change.
    fn state_changed(&self, version: StateVersion);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_strictly_greater() {
        let v = StateVersion::default();
        assert!(v.next() > v);
        assert_eq!(v.next().next(), StateVersion(2));
    }
}
