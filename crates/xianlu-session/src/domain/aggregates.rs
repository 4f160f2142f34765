//! Aggregate root for the Game Session context.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use xianlu_character::{Attributes, Character};
use xianlu_core::clock::Clock;
use xianlu_core::error::DomainError;
use xianlu_core::rng::DeterministicRng;
use xianlu_core::signal::{StateObserver, StateVersion};
use xianlu_narrative::application::query_handlers::{NodeView, current_node_view};
use xianlu_narrative::{NarrativeEngine, RecentChanges, Transition};

use super::codec;

/// One playthrough: the committed character plus everything the UI reads
/// alongside it.
///
/// Every committed change bumps the version and notifies observers. Choices
/// run against a working copy inside the engine; an ignored choice commits
/// nothing.
pub struct GameSession {
    /// Session identifier.
    pub id: Uuid,
    engine: Arc<NarrativeEngine>,
    character: Character,
    version: StateVersion,
    recent_changes: RecentChanges,
    observers: Vec<Arc<dyn StateObserver>>,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("current_node", &self.character.current_node)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Creates a session with a fresh character.
    #[must_use]
    pub fn new(id: Uuid, engine: Arc<NarrativeEngine>) -> Self {
        let character = engine.start_new_game();
        Self::with_character(id, engine, character)
    }

    /// Creates a session around an existing character, e.g. one restored from
    /// a save code.
    #[must_use]
    pub fn with_character(id: Uuid, engine: Arc<NarrativeEngine>, character: Character) -> Self {
        Self {
            id,
            engine,
            character,
            version: StateVersion::default(),
            recent_changes: RecentChanges::default(),
            observers: Vec::new(),
        }
    }

    /// Read-only view of the committed character.
    #[must_use]
    pub fn character(&self) -> &Character {
        &self.character
    }

    /// Token of the committed state.
    #[must_use]
    pub fn version(&self) -> StateVersion {
        self.version
    }

    /// The engine this session plays against.
    #[must_use]
    pub fn engine(&self) -> &NarrativeEngine {
        &self.engine
    }

    /// Changes made by the last committed transition, until cleared.
    #[must_use]
    pub fn recent_changes(&self) -> &RecentChanges {
        &self.recent_changes
    }

    /// Registers an observer for the state-changed signal.
    pub fn subscribe(&mut self, observer: Arc<dyn StateObserver>) {
        self.observers.push(observer);
    }

    /// Replaces the character with a fresh one on the root node.
    pub fn start_new_game(&mut self) -> StateVersion {
        let character = self.engine.start_new_game();
        self.commit(character, RecentChanges::default())
    }

    /// Like [`start_new_game`](Self::start_new_game) with explicit starting
    /// attributes.
    pub fn start_new_game_with(&mut self, attributes: Attributes) -> StateVersion {
        let character = self.engine.start_new_game_with(attributes);
        self.commit(character, RecentChanges::default())
    }

    /// Discards the run and starts over.
    pub fn reset_game(&mut self) -> StateVersion {
        info!(game_id = %self.id, "game reset");
        self.start_new_game()
    }

    /// Resolves `choice_id` and commits the outcome.
    ///
    /// Ignored choices leave the session untouched.
    pub fn make_choice(&mut self, choice_id: &str, rng: &mut dyn DeterministicRng) -> Transition {
        let mut transition = self.engine.make_choice(&self.character, choice_id, rng);
        if let Some(character) = transition.character.take() {
            self.commit(character, transition.changes.clone());
        } else {
            debug!(game_id = %self.id, choice_id, "choice ignored");
        }
        transition
    }

    /// Replaces the character with one decoded from `code`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSave` if the code cannot be decoded; the
    /// session is left unchanged.
    pub fn load_from_save_code(&mut self, code: &str) -> Result<StateVersion, DomainError> {
        let character =
            codec::decode(code, &self.engine.resolver(), self.engine.experience_table())?;
        info!(game_id = %self.id, node = %character.current_node, "game loaded from save code");
        Ok(self.commit(character, RecentChanges::default()))
    }

    /// Encodes the committed character as a save code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the state cannot be encoded.
    pub fn save_code(&self, clock: &dyn Clock) -> Result<String, DomainError> {
        codec::encode(&self.character, clock.now())
    }

    /// View of the node the character stands on.
    #[must_use]
    pub fn current_node_view(&self) -> NodeView {
        current_node_view(&self.engine, &self.character)
    }

    /// Clears the recent-changes bag if `token` is still the committed
    /// version. Returns whether anything was cleared.
    ///
    /// A stale token means a newer change has been committed since the
    /// caller scheduled the clear; that change stays visible.
    pub fn clear_recent_changes(&mut self, token: StateVersion) -> bool {
        if token != self.version {
            debug!(game_id = %self.id, ?token, current = ?self.version, "stale clear ignored");
            return false;
        }
        self.recent_changes = RecentChanges::default();
        true
    }

    fn commit(&mut self, character: Character, changes: RecentChanges) -> StateVersion {
        self.character = character;
        self.recent_changes = changes;
        self.version = self.version.next();
        for observer in &self.observers {
            observer.state_changed(self.version);
        }
        self.version
    }
}
