//! Query handlers for the Game Session context.
//!
//! Read-only view DTOs handed to the UI and to achievement evaluators.

use serde::Serialize;
use uuid::Uuid;
use xianlu_character::{Character, EndingRecord};
use xianlu_core::signal::StateVersion;
use xianlu_narrative::RecentChanges;
use xianlu_narrative::application::query_handlers::NodeView;

use crate::domain::aggregates::GameSession;

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game_id: Uuid,
    /// Pass back when clearing recent changes.
    pub version: StateVersion,
    pub node: NodeView,
    pub character: Character,
    pub recent_changes: RecentChanges,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_transition: Option<String>,
    pub is_game_ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending: Option<EndingRecord>,
    /// Chance, in percent, that forcing an unavailable choice fails.
    pub failure_probability: u32,
}

/// Builds the view of `session`'s committed state.
#[must_use]
pub fn get_game_view(session: &GameSession) -> GameView {
    let character = session.character();
    GameView {
        game_id: session.id,
        version: session.version(),
        node: session.current_node_view(),
        character: character.clone(),
        recent_changes: session.recent_changes().clone(),
        pending_transition: character.pending_transition.clone(),
        is_game_ended: character.is_game_ended,
        ending: character.ending.clone(),
        failure_probability: session.engine().failure_probability(character),
    }
}
