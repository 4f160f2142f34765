//! Save code codec.
//!
//! A save code is the JSON envelope, percent-encoded with the URI component
//! character set, then base64-encoded (standard alphabet, padded). Decoding
//! reverses every layer and fails closed: any corrupt layer, or an envelope
//! without `character` or `currentNode`, is an `InvalidSave`.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use xianlu_character::{
    Attributes, Character, Cultivation, Equipment, ExperienceTable, Inventory, Resources,
};
use xianlu_core::error::DomainError;
use xianlu_narrative::domain::resolver::NodeResolver;

use super::schema::SCHEMA_VERSION;

/// Characters left unescaped: alphanumerics and `-_.!~*'()`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, C: Serialize> {
    schema_version: u32,
    character: C,
    current_node: &'a str,
    saved_at: DateTime<Utc>,
}

/// The reduced projection written when the full character cannot be
/// serialized.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SafeProjection<'a> {
    attributes: &'a Attributes,
    health: i32,
    age: u32,
    resources: &'a Resources,
    cultivation: &'a Cultivation,
    status_effects: &'a BTreeSet<String>,
    choices: &'a [String],
    inventory: &'a Inventory,
    equipment: &'a Equipment,
    current_node: &'a str,
    claimed_achievements: &'a BTreeSet<String>,
    is_game_ended: bool,
}

impl<'a> From<&'a Character> for SafeProjection<'a> {
    fn from(c: &'a Character) -> Self {
        Self {
            attributes: &c.attributes,
            health: c.health,
            age: c.age,
            resources: &c.resources,
            cultivation: &c.cultivation,
            status_effects: &c.status_effects,
            choices: &c.choices,
            inventory: &c.inventory,
            equipment: &c.equipment,
            current_node: &c.current_node,
            claimed_achievements: &c.claimed_achievements,
            is_game_ended: c.is_game_ended,
        }
    }
}

/// Encodes `character` into a save code.
///
/// Transient fields are never written.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if neither the full character nor the
/// safe projection can be serialized.
pub fn encode(character: &Character, saved_at: DateTime<Utc>) -> Result<String, DomainError> {
    let json = encode_with_fallback(
        || {
            serde_json::to_string(&Envelope {
                schema_version: SCHEMA_VERSION,
                character,
                current_node: &character.current_node,
                saved_at,
            })
        },
        || {
            serde_json::to_string(&Envelope {
                schema_version: SCHEMA_VERSION,
                character: SafeProjection::from(character),
                current_node: &character.current_node,
                saved_at,
            })
        },
    )?;
    Ok(wrap(&json))
}

/// Runs `full`, then `safe` if `full` fails.
fn encode_with_fallback<F, S>(full: F, safe: S) -> Result<String, DomainError>
where
    F: FnOnce() -> serde_json::Result<String>,
    S: FnOnce() -> serde_json::Result<String>,
{
    match full() {
        Ok(json) => Ok(json),
        Err(e) => {
            warn!(error = %e, "full save serialization failed, retrying with safe projection");
            safe().map_err(|e| DomainError::Serialization(e.to_string()))
        }
    }
}

fn wrap(json: &str) -> String {
    let escaped = utf8_percent_encode(json, URI_COMPONENT).to_string();
    STANDARD.encode(escaped)
}

fn unwrap_layers(code: &str) -> Result<Value, DomainError> {
    let bytes = STANDARD
        .decode(code.trim())
        .map_err(|e| DomainError::InvalidSave(format!("base64: {e}")))?;
    let escaped =
        String::from_utf8(bytes).map_err(|e| DomainError::InvalidSave(format!("utf-8: {e}")))?;
    let json = percent_decode_str(&escaped)
        .decode_utf8()
        .map_err(|e| DomainError::InvalidSave(format!("percent-encoding: {e}")))?;
    serde_json::from_str(&json).map_err(|e| DomainError::InvalidSave(format!("json: {e}")))
}

/// Decodes a save code produced by [`encode`] (or an older schema of it).
///
/// Fields the save predates are backfilled with defaults. Bounded values
/// (attributes, health, resources, cultivation against `table`) are
/// re-clamped, and the saved node id goes through the migration resolver.
///
/// # Errors
///
/// Returns `DomainError::InvalidSave` if any layer is corrupt, the envelope
/// lacks `character` or `currentNode`, or the character is dead in a run
/// that never ended.
pub fn decode(
    code: &str,
    resolver: &NodeResolver<'_>,
    table: &ExperienceTable,
) -> Result<Character, DomainError> {
    let mut envelope = unwrap_layers(code)?;
    let current_node = match envelope.get("currentNode") {
        Some(Value::String(id)) => id.clone(),
        _ => return Err(DomainError::InvalidSave("missing currentNode".into())),
    };
    let character = envelope
        .get_mut("character")
        .filter(|c| c.is_object())
        .map(Value::take)
        .ok_or_else(|| DomainError::InvalidSave("missing character".into()))?;

    let mut character: Character = serde_json::from_value(character)
        .map_err(|e| DomainError::InvalidSave(format!("character: {e}")))?;
    character.clamp_to(table);
    if !character.is_alive() && !character.is_game_ended {
        return Err(DomainError::InvalidSave(
            "character is dead but the run never ended".into(),
        ));
    }

    let canonical = resolver.canonical_id(&current_node);
    if canonical != current_node {
        debug!(legacy = %current_node, canonical = %canonical, "migrated saved node id");
    }
    character.current_node = canonical.to_owned();
    character.pending_transition = None;
    Ok(character)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;
    use xianlu_narrative::domain::graph::{Node, NodeKind, StoryGraph};
    use xianlu_narrative::domain::migration::MigrationMap;
    use xianlu_character::domain::aggregates::MAX_HEALTH;
    use xianlu_core::clock::Clock;
    use xianlu_test_support::FixedClock;

    use super::*;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_owned(),
            text: id.to_owned(),
            kind,
            chapter: 1,
            section: 1,
            media: None,
            on_enter: Vec::new(),
            choices: Vec::new(),
        }
    }

    fn graph() -> StoryGraph {
        let nodes = vec![
            node("start", NodeKind::Story),
            node("sect_gate", NodeKind::Story),
            node("death", NodeKind::Ending),
        ];
        StoryGraph::new(nodes, "start", "start", "death").unwrap()
    }

    fn migrations() -> MigrationMap {
        MigrationMap::new(BTreeMap::from([("sect_entrance".to_owned(), "sect_gate".to_owned())]))
    }

    fn raw(value: &Value) -> String {
        wrap(&value.to_string())
    }

    #[test]
    fn test_round_trip_preserves_character() {
        // Arrange
        let graph = graph();
        let migrations = migrations();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let mut character = Character::new("sect_gate", Attributes::uniform(7));
        character.adjust_spirit_stone(35);
        character.set_flag("joined_sect");
        character.record("进入山门 · 仙路漫漫");
        character.visited_nodes.insert("start".to_owned());

        // Act
        let code = encode(&character, FixedClock::epoch().now()).unwrap();
        let decoded = decode(&code, &resolver, &table).unwrap();

        // Assert
        assert_eq!(decoded, character);
    }

    #[test]
    fn test_code_is_base64_of_percent_encoded_json() {
        let character = Character::new("start", Attributes::default());

        let code = encode(&character, FixedClock::epoch().now()).unwrap();

        let escaped = String::from_utf8(STANDARD.decode(&code).unwrap()).unwrap();
        assert!(escaped.starts_with("%7B%22schemaVersion%22"));
        assert!(escaped.is_ascii());
    }

    #[test]
    fn test_pending_transition_is_stripped() {
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let mut character = Character::new("start", Attributes::default());
        character.pending_transition = Some("sect_gate".to_owned());

        let code = encode(&character, FixedClock::epoch().now()).unwrap();

        assert_eq!(decode(&code, &resolver, &table).unwrap().pending_transition, None);
    }

    #[test]
    fn test_truncated_code_is_rejected() {
        // Arrange
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let code = encode(&Character::new("start", Attributes::default()), FixedClock::epoch().now())
            .unwrap();
        let truncated = &code[..code.len() - 1];

        // Act
        let result = decode(truncated, &resolver, &table);

        // Assert
        assert!(matches!(result, Err(DomainError::InvalidSave(_))));
    }

    #[test]
    fn test_garbage_layers_are_rejected() {
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();

        let codes = [
            "!!!".to_owned(),
            String::new(),
            STANDARD.encode("%E0%A4%A"),
            STANDARD.encode("not json"),
        ];
        for code in &codes {
            assert!(
                matches!(decode(code, &resolver, &table), Err(DomainError::InvalidSave(_))),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_character_or_node_is_rejected() {
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let character = serde_json::to_value(Character::new("start", Attributes::default())).unwrap();

        let no_node = raw(&json!({ "schemaVersion": SCHEMA_VERSION, "character": character }));
        let no_character = raw(&json!({ "schemaVersion": SCHEMA_VERSION, "currentNode": "start" }));

        assert!(matches!(decode(&no_node, &resolver, &table), Err(DomainError::InvalidSave(_))));
        assert!(matches!(decode(&no_character, &resolver, &table), Err(DomainError::InvalidSave(_))));
    }

    #[test]
    fn test_legacy_node_id_is_migrated() {
        let graph = graph();
        let migrations = migrations();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let character = Character::new("sect_entrance", Attributes::default());

        let code = encode(&character, FixedClock::epoch().now()).unwrap();

        assert_eq!(decode(&code, &resolver, &table).unwrap().current_node, "sect_gate");
    }

    #[test]
    fn test_old_save_is_backfilled_and_clamped() {
        // Arrange
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let code = raw(&json!({
            "currentNode": "start",
            "character": {
                "attributes": { "charm": 30, "comprehension": -2, "constitution": 5, "family": 5, "luck": 5 },
                "cultivation": { "level": 2, "stage": 1 },
                "health": 140,
                "choices": ["旧日记忆"]
            }
        }));

        // Act
        let character = decode(&code, &resolver, &table).unwrap();

        // Assert
        assert_eq!(character.attributes.charm, 20);
        assert_eq!(character.attributes.comprehension, 0);
        assert_eq!(character.health, MAX_HEALTH);
        assert_eq!(character.cultivation.realm(), (2, 1));
        assert_eq!(character.choices, vec!["旧日记忆".to_owned()]);
        assert!(character.flags.is_empty());
        assert!(character.visited_nodes.is_empty());
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        // Arrange
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let code = raw(&json!({
            "currentNode": "start",
            "character": {
                "attributes": { "charm": 5, "comprehension": 5, "constitution": 5, "family": 5, "luck": 5 },
                "cultivation": { "level": 200, "stage": 77, "experience": 4_000_000_000_u32 },
                "resources": { "spiritStone": -500, "pills": -3 }
            }
        }));

        // Act
        let character = decode(&code, &resolver, &table).unwrap();

        // Assert
        assert_eq!(character.cultivation.level, table.max_level());
        assert_eq!(character.cultivation.stage, 3);
        assert_eq!(
            character.cultivation.experience,
            table.required_for(table.max_level())
        );
        assert_eq!(character.resources.spirit_stone, 0);
        assert_eq!(character.resources.pills, 0);
    }

    #[test]
    fn test_excess_experience_below_max_level_stays_short_of_the_threshold() {
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let code = raw(&json!({
            "currentNode": "start",
            "character": {
                "attributes": { "charm": 5, "comprehension": 5, "constitution": 5, "family": 5, "luck": 5 },
                "cultivation": { "level": 1, "stage": 0, "experience": 999_999 }
            }
        }));

        let character = decode(&code, &resolver, &table).unwrap();

        assert_eq!(character.cultivation.level, 1);
        assert_eq!(character.cultivation.experience, table.required_for(1) - 1);
    }

    #[test]
    fn test_dead_character_in_a_running_game_is_rejected() {
        // Arrange
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let mut character = Character::new("start", Attributes::default());
        character.health = -20;
        let code = encode(&character, FixedClock::epoch().now()).unwrap();

        // Act
        let result = decode(&code, &resolver, &table);

        // Assert
        assert!(matches!(result, Err(DomainError::InvalidSave(_))));
    }

    #[test]
    fn test_dead_character_in_an_ended_game_is_accepted() {
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let mut character = Character::new("death", Attributes::default());
        character.health = 0;
        character.is_game_ended = true;
        let code = encode(&character, FixedClock::epoch().now()).unwrap();

        let decoded = decode(&code, &resolver, &table).unwrap();

        assert!(decoded.is_game_ended);
        assert_eq!(decoded.health, 0);
    }

    #[test]
    fn test_safe_projection_decodes_with_defaults() {
        // Arrange
        let graph = graph();
        let migrations = MigrationMap::default();
        let resolver = NodeResolver::new(&graph, &migrations);
        let table = ExperienceTable::default();
        let mut character = Character::new("start", Attributes::uniform(9));
        character.set_flag("lost_on_fallback");
        character.claimed_achievements.insert("first_step".to_owned());
        let json = serde_json::to_string(&Envelope {
            schema_version: SCHEMA_VERSION,
            character: SafeProjection::from(&character),
            current_node: &character.current_node,
            saved_at: FixedClock::epoch().now(),
        })
        .unwrap();

        // Act
        let decoded = decode(&wrap(&json), &resolver, &table).unwrap();

        // Assert
        assert_eq!(decoded.attributes, character.attributes);
        assert!(decoded.claimed_achievements.contains("first_step"));
        assert!(decoded.flags.is_empty());
    }

    #[test]
    fn test_fallback_is_used_when_full_serialization_fails() {
        let failing = || serde_json::from_str::<String>("{").map(|_| String::new());

        let json = encode_with_fallback(failing, || Ok("safe".to_owned())).unwrap();

        assert_eq!(json, "safe");
    }

    #[test]
    fn test_repeated_failure_is_a_serialization_error() {
        let failing = || serde_json::from_str::<String>("{").map(|_| String::new());

        let result = encode_with_fallback(failing, failing);

        assert!(matches!(result, Err(DomainError::Serialization(_))));
    }
}
