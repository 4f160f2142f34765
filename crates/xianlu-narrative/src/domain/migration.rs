//! Legacy node-id migration map.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Static bidirectional table between legacy and canonical node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct MigrationMap {
    forward: HashMap<String, String>,
    reverse: HashMap<String, Vec<String>>,
}

impl MigrationMap {
    /// Builds the map from `(legacy, canonical)` pairs.
    pub fn new<I, L, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, C)>,
        L: Into<String>,
        C: Into<String>,
    {
        let mut map = Self::default();
        for (legacy, canonical) in entries {
            let legacy = legacy.into();
            let canonical = canonical.into();
            map.reverse
                .entry(canonical.clone())
                .or_default()
                .push(legacy.clone());
            map.forward.insert(legacy, canonical);
        }
        for legacy_ids in map.reverse.values_mut() {
            legacy_ids.sort();
            legacy_ids.dedup();
        }
        map
    }

    /// Canonical id for a legacy id.
    #[must_use]
    pub fn canonical(&self, legacy: &str) -> Option<&str> {
        self.forward.get(legacy).map(String::as_str)
    }

    /// Legacy ids that map onto `canonical`.
    #[must_use]
    pub fn legacy_ids(&self, canonical: &str) -> &[String] {
        self.reverse
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All `(legacy, canonical)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(l, c)| (l.as_str(), c.as_str()))
    }

    /// Number of legacy ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl From<BTreeMap<String, String>> for MigrationMap {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self::new(entries)
    }
}

impl From<MigrationMap> for BTreeMap<String, String> {
    fn from(map: MigrationMap) -> Self {
        map.forward.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_reverse_lookup() {
        let map = MigrationMap::new([
            ("chapter1_start", "c1_intro"),
            ("old_intro", "c1_intro"),
            ("sect_gate", "c2_gate"),
        ]);

        assert_eq!(map.canonical("old_intro"), Some("c1_intro"));
        assert_eq!(map.canonical("c1_intro"), None);
        assert_eq!(map.legacy_ids("c1_intro"), ["chapter1_start", "old_intro"]);
        assert!(map.legacy_ids("nowhere").is_empty());
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_round_trips_through_plain_map() {
        let map: MigrationMap = serde_json::from_str(r#"{"a": "b", "c": "d"}"#).unwrap();
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"a": "b", "c": "d"}));
    }
}
