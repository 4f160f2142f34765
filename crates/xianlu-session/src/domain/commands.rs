//! Commands for the Game Session context.

use uuid::Uuid;
use xianlu_character::Attributes;
use xianlu_core::command::Command;
use xianlu_core::signal::StateVersion;

/// Command to start a new game.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Starting attributes; the configured defaults when `None`.
    pub attributes: Option<Attributes>,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "session.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to take a choice on the current node.
#[derive(Debug, Clone)]
pub struct MakeChoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game session identifier.
    pub game_id: Uuid,
    pub choice_id: String,
}

impl Command for MakeChoice {
    fn command_type(&self) -> &'static str {
        "session.make_choice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to discard the run and start over.
#[derive(Debug, Clone)]
pub struct ResetGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game session identifier.
    pub game_id: Uuid,
}

impl Command for ResetGame {
    fn command_type(&self) -> &'static str {
        "session.reset_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to replace the run with one decoded from a save code.
#[derive(Debug, Clone)]
pub struct LoadGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game session identifier.
    pub game_id: Uuid,
    pub save_code: String,
}

impl Command for LoadGame {
    fn command_type(&self) -> &'static str {
        "session.load_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to clear the recent-changes bag once the UI has shown it.
#[derive(Debug, Clone)]
pub struct ClearRecentChanges {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game session identifier.
    pub game_id: Uuid,
    /// The version the UI rendered; stale versions are ignored.
    pub version: StateVersion,
}

impl Command for ClearRecentChanges {
    fn command_type(&self) -> &'static str {
        "session.clear_recent_changes"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
