//! Command handlers for the Game Session context.
//!
//! Handlers act on a session the caller has already looked up and locked;
//! persistence goes through the autosave worker so a burst of choices costs
//! one write.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use xianlu_core::clock::Clock;
use xianlu_core::command::Command;
use xianlu_core::error::DomainError;
use xianlu_core::rng::DeterministicRng;
use xianlu_core::signal::StateVersion;
use xianlu_core::store::PersistenceStore;
use xianlu_narrative::{NarrativeEngine, Transition};

use crate::application::autosave::AutosaveHandle;
use crate::domain::aggregates::GameSession;
use crate::domain::codec;
use crate::domain::commands::{ClearRecentChanges, LoadGame, MakeChoice, ResetGame, StartGame};

/// Store key holding the most recent save of any game. Doubles as the
/// schema guard's probe key.
pub const LAST_SAVE_KEY: &str = "xianlu:save:last";

/// Store key holding the save code of `game_id`.
#[must_use]
pub fn save_key(game_id: Uuid) -> String {
    format!("xianlu:save:{game_id}")
}

/// Result of a successfully handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCommandResult {
    /// The game affected or created by the command.
    pub game_id: Uuid,
    /// The committed state version.
    pub version: StateVersion,
}

fn ensure_target(session: &GameSession, game_id: Uuid) -> Result<(), DomainError> {
    if session.id == game_id {
        Ok(())
    } else {
        Err(DomainError::GameNotFound(game_id))
    }
}

/// Handles the `StartGame` command: creates a session with a fresh
/// character.
#[must_use]
pub fn handle_start_game(command: &StartGame, engine: Arc<NarrativeEngine>) -> GameSession {
    let character = match command.attributes {
        Some(attributes) => engine.start_new_game_with(attributes),
        None => engine.start_new_game(),
    };
    let session = GameSession::with_character(Uuid::new_v4(), engine, character);
    info!(
        correlation_id = %command.correlation_id(),
        command = command.command_type(),
        game_id = %session.id,
        "game started"
    );
    session
}

/// Handles the `MakeChoice` command.
///
/// The choice itself never fails; an unknown choice comes back as an ignored
/// transition.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` if `session` is not the game the
/// command targets.
pub fn handle_make_choice(
    command: &MakeChoice,
    session: &mut GameSession,
    rng: &mut dyn DeterministicRng,
) -> Result<Transition, DomainError> {
    ensure_target(session, command.game_id)?;
    let transition = session.make_choice(&command.choice_id, rng);
    info!(
        correlation_id = %command.correlation_id(),
        command = command.command_type(),
        game_id = %command.game_id,
        choice_id = %command.choice_id,
        ignored = transition.is_ignored(),
        terminal = transition.is_terminal(),
        "choice resolved"
    );
    for diagnostic in &transition.diagnostics {
        warn!(game_id = %command.game_id, ?diagnostic, "recovered during choice resolution");
    }
    Ok(transition)
}

/// Handles the `ResetGame` command.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` if `session` is not the game the
/// command targets.
pub fn handle_reset_game(
    command: &ResetGame,
    session: &mut GameSession,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(session, command.game_id)?;
    let version = session.reset_game();
    info!(correlation_id = %command.correlation_id(), game_id = %command.game_id, "game reset");
    Ok(SessionCommandResult {
        game_id: command.game_id,
        version,
    })
}

/// Handles the `LoadGame` command.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` on a session mismatch, or
/// `DomainError::InvalidSave` if the save code is rejected. The session is
/// unchanged on error.
pub fn handle_load_game(
    command: &LoadGame,
    session: &mut GameSession,
) -> Result<SessionCommandResult, DomainError> {
    ensure_target(session, command.game_id)?;
    let version = session.load_from_save_code(&command.save_code).inspect_err(|e| {
        warn!(correlation_id = %command.correlation_id(), game_id = %command.game_id, error = %e, "save code rejected");
    })?;
    info!(correlation_id = %command.correlation_id(), game_id = %command.game_id, "game loaded");
    Ok(SessionCommandResult {
        game_id: command.game_id,
        version,
    })
}

/// Handles the `ClearRecentChanges` command. Returns whether the bag was
/// cleared; a stale version leaves it alone.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` if `session` is not the game the
/// command targets.
pub fn handle_clear_recent_changes(
    command: &ClearRecentChanges,
    session: &mut GameSession,
) -> Result<bool, DomainError> {
    ensure_target(session, command.game_id)?;
    Ok(session.clear_recent_changes(command.version))
}

/// Queues the session's current save code for persistence.
///
/// Encoding failures are logged and skipped; the in-memory session is the
/// source of truth until the next successful write.
pub fn schedule_autosave(session: &GameSession, clock: &dyn Clock, autosave: &AutosaveHandle) {
    match session.save_code(clock) {
        Ok(code) => {
            autosave.schedule(save_key(session.id), code.clone());
            autosave.schedule(LAST_SAVE_KEY, code);
        }
        Err(e) => warn!(game_id = %session.id, error = %e, "autosave skipped"),
    }
}

/// Rebuilds a session from its persisted save code.
///
/// # Errors
///
/// Returns `DomainError::GameNotFound` if nothing is stored for `game_id`,
/// `DomainError::InvalidSave` if the stored code is rejected, or a store
/// error.
pub async fn restore_game(
    game_id: Uuid,
    engine: Arc<NarrativeEngine>,
    store: &dyn PersistenceStore,
) -> Result<GameSession, DomainError> {
    let code = store
        .load(&save_key(game_id))
        .await?
        .ok_or(DomainError::GameNotFound(game_id))?;
    let character = codec::decode(&code, &engine.resolver(), engine.experience_table())?;
    info!(%game_id, node = %character.current_node, "game restored from store");
    Ok(GameSession::with_character(game_id, engine, character))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use xianlu_character::Attributes;
    use xianlu_content::load_bundled_story;
    use xianlu_test_support::{FailingStore, FixedClock, RecordingStore, SequenceRng};

    use super::*;
    use crate::application::autosave::spawn_autosave;

    fn engine() -> Arc<NarrativeEngine> {
        Arc::new(load_bundled_story().unwrap().engine)
    }

    fn start(engine: Arc<NarrativeEngine>) -> GameSession {
        handle_start_game(
            &StartGame {
                correlation_id: Uuid::new_v4(),
                attributes: None,
            },
            engine,
        )
    }

    #[test]
    fn test_start_game_with_attributes() {
        // Arrange
        let command = StartGame {
            correlation_id: Uuid::new_v4(),
            attributes: Some(Attributes::uniform(12)),
        };

        // Act
        let session = handle_start_game(&command, engine());

        // Assert
        assert_eq!(session.character().attributes, Attributes::uniform(12));
        assert_eq!(session.character().current_node, "prologue");
    }

    #[test]
    fn test_make_choice_advances() {
        let mut session = start(engine());
        let command = MakeChoice {
            correlation_id: Uuid::new_v4(),
            game_id: session.id,
            choice_id: "help_elder".to_owned(),
        };
        let mut rng = SequenceRng::new(vec![99]);

        let transition = handle_make_choice(&command, &mut session, &mut rng).unwrap();

        assert!(!transition.is_ignored());
        assert_eq!(session.character().current_node, "village_square");
    }

    #[test]
    fn test_mismatched_game_is_not_found() {
        let mut session = start(engine());
        let other = Uuid::new_v4();
        let command = ResetGame {
            correlation_id: Uuid::new_v4(),
            game_id: other,
        };

        let result = handle_reset_game(&command, &mut session);

        assert!(matches!(result, Err(DomainError::GameNotFound(id)) if id == other));
    }

    #[test]
    fn test_load_game_rejects_bad_code() {
        let mut session = start(engine());
        let command = LoadGame {
            correlation_id: Uuid::new_v4(),
            game_id: session.id,
            save_code: "%%%".to_owned(),
        };

        let result = handle_load_game(&command, &mut session);

        assert!(matches!(result, Err(DomainError::InvalidSave(_))));
        assert_eq!(session.version(), StateVersion(0));
    }

    #[test]
    fn test_clear_recent_changes_checks_version() {
        let mut session = start(engine());
        let mut rng = SequenceRng::new(vec![99]);
        session.make_choice("help_elder", &mut rng);
        let game_id = session.id;
        let command = |version| ClearRecentChanges {
            correlation_id: Uuid::new_v4(),
            game_id,
            version,
        };
        let stale = command(StateVersion(0));
        let current = command(StateVersion(1));

        assert!(!handle_clear_recent_changes(&stale, &mut session).unwrap());
        assert!(handle_clear_recent_changes(&current, &mut session).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_then_restore() {
        // Arrange
        let engine = engine();
        let store = Arc::new(RecordingStore::new());
        let (autosave, _task) = spawn_autosave(store.clone(), Duration::from_millis(200));
        let mut session = start(Arc::clone(&engine));
        let mut rng = SequenceRng::new(vec![99]);
        session.make_choice("study_scroll", &mut rng);

        // Act
        schedule_autosave(&session, &FixedClock::epoch(), &autosave);
        autosave.flush().await;
        let restored = restore_game(session.id, engine, store.as_ref()).await.unwrap();

        // Assert
        assert!(store.get(LAST_SAVE_KEY).is_some());
        assert_eq!(restored.id, session.id);
        assert_eq!(restored.character().current_node, "village_square");
        assert_eq!(restored.character().choices, session.character().choices);
    }

    #[tokio::test]
    async fn test_restore_unknown_game_is_not_found() {
        let id = Uuid::new_v4();

        let result = restore_game(id, engine(), &RecordingStore::new()).await;

        assert!(matches!(result, Err(DomainError::GameNotFound(found)) if found == id));
    }

    #[tokio::test]
    async fn test_restore_propagates_store_failure() {
        let result = restore_game(Uuid::new_v4(), engine(), &FailingStore).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
