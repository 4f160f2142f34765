//! Routes for the Game Session bounded context.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use xianlu_character::Attributes;
use xianlu_core::error::DomainError;
use xianlu_core::signal::StateVersion;
use xianlu_narrative::Transition;
use xianlu_session::application::command_handlers::{self, schedule_autosave};
use xianlu_session::application::query_handlers::{GameView, get_game_view};
use xianlu_session::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    /// Starting attributes; the story's defaults when omitted.
    #[serde(default)]
    pub attributes: Option<Attributes>,
}

/// Response body for POST /.
#[derive(Debug, Serialize)]
pub struct StartGameResponse {
    #[serde(flatten)]
    pub game: GameView,
    /// Set once after old saves were wiped by a format change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

/// Request body for POST /{game_id}/choices.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeChoiceRequest {
    pub choice_id: String,
}

/// Response body for POST /{game_id}/choices.
#[derive(Debug, Serialize)]
pub struct ChoiceResponse {
    pub transition: Transition,
    pub game: GameView,
}

/// Response body for GET /{game_id}/save-code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCodeResponse {
    pub save_code: String,
}

/// Request body for POST /{game_id}/load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadGameRequest {
    pub save_code: String,
}

/// Request body for POST /{game_id}/recent-changes/clear.
#[derive(Debug, Deserialize)]
pub struct ClearRecentChangesRequest {
    /// The version the client rendered.
    pub version: StateVersion,
}

/// Response body for POST /{game_id}/recent-changes/clear.
#[derive(Debug, Serialize)]
pub struct ClearRecentChangesResponse {
    pub cleared: bool,
    pub version: StateVersion,
}

fn rng_poisoned<E: std::fmt::Display>(e: E) -> DomainError {
    DomainError::Infrastructure(format!("RNG mutex poisoned: {e}"))
}

/// POST /
#[instrument(skip(state, request))]
async fn start_game(
    State(state): State<AppState>,
    Json(request): Json<StartGameRequest>,
) -> Result<Json<StartGameResponse>, ApiError> {
    let command = commands::StartGame {
        correlation_id: Uuid::new_v4(),
        attributes: request.attributes,
    };

    info!(correlation_id = %command.correlation_id, "handling start_game command");

    let session = command_handlers::handle_start_game(&command, state.engine.clone());
    schedule_autosave(&session, state.clock.as_ref(), &state.autosave);
    let game = get_game_view(&session);
    state.insert_game(session).await;

    Ok(Json(StartGameResponse {
        game,
        notice: state.take_schema_notice(),
    }))
}

/// GET /{game_id}
#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    let game = state.game(game_id).await?;
    let session = game.lock().await;
    Ok(Json(get_game_view(&session)))
}

/// POST /{game_id}/choices
#[instrument(skip(state, request), fields(choice_id = %request.choice_id))]
async fn make_choice(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<MakeChoiceRequest>,
) -> Result<Json<ChoiceResponse>, ApiError> {
    let command = commands::MakeChoice {
        correlation_id: Uuid::new_v4(),
        game_id,
        choice_id: request.choice_id,
    };

    info!(correlation_id = %command.correlation_id, "handling make_choice command");

    let game = state.game(game_id).await?;
    let mut session = game.lock().await;

    // The RNG lock is held only for the synchronous resolution, never across an await.
    let transition = {
        let mut rng = state.rng.lock().map_err(rng_poisoned)?;
        command_handlers::handle_make_choice(&command, &mut session, &mut *rng)?
    };

    if !transition.is_ignored() {
        schedule_autosave(&session, state.clock.as_ref(), &state.autosave);
    }

    Ok(Json(ChoiceResponse {
        transition,
        game: get_game_view(&session),
    }))
}

/// POST /{game_id}/reset
#[instrument(skip(state))]
async fn reset_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    let command = commands::ResetGame {
        correlation_id: Uuid::new_v4(),
        game_id,
    };

    info!(correlation_id = %command.correlation_id, "handling reset_game command");

    let game = state.game(game_id).await?;
    let mut session = game.lock().await;
    command_handlers::handle_reset_game(&command, &mut session)?;
    schedule_autosave(&session, state.clock.as_ref(), &state.autosave);

    Ok(Json(get_game_view(&session)))
}

/// GET /{game_id}/save-code
#[instrument(skip(state))]
async fn get_save_code(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<SaveCodeResponse>, ApiError> {
    let game = state.game(game_id).await?;
    let session = game.lock().await;
    let save_code = session.save_code(state.clock.as_ref())?;
    Ok(Json(SaveCodeResponse { save_code }))
}

/// POST /{game_id}/load
#[instrument(skip(state, request))]
async fn load_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<LoadGameRequest>,
) -> Result<Json<GameView>, ApiError> {
    let command = commands::LoadGame {
        correlation_id: Uuid::new_v4(),
        game_id,
        save_code: request.save_code,
    };

    info!(correlation_id = %command.correlation_id, "handling load_game command");

    let game = state.game(game_id).await?;
    let mut session = game.lock().await;
    command_handlers::handle_load_game(&command, &mut session)?;
    schedule_autosave(&session, state.clock.as_ref(), &state.autosave);

    Ok(Json(get_game_view(&session)))
}

/// POST /{game_id}/recent-changes/clear
#[instrument(skip(state, request), fields(version = request.version.0))]
async fn clear_recent_changes(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<ClearRecentChangesRequest>,
) -> Result<Json<ClearRecentChangesResponse>, ApiError> {
    let command = commands::ClearRecentChanges {
        correlation_id: Uuid::new_v4(),
        game_id,
        version: request.version,
    };

    let game = state.game(game_id).await?;
    let mut session = game.lock().await;
    let cleared = command_handlers::handle_clear_recent_changes(&command, &mut session)?;

    Ok(Json(ClearRecentChangesResponse {
        cleared,
        version: session.version(),
    }))
}

/// Returns the router for the game session context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_game))
        .route("/{game_id}", get(get_game))
        .route("/{game_id}/choices", post(make_choice))
        .route("/{game_id}/reset", post(reset_game))
        .route("/{game_id}/save-code", get(get_save_code))
        .route("/{game_id}/load", post(load_game))
        .route("/{game_id}/recent-changes/clear", post(clear_recent_changes))
}
