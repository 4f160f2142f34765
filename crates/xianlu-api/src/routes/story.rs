//! Routes for the Story Content context.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use xianlu_content::application::query_handlers::StorySummary;

use crate::state::AppState;

/// GET /
async fn get_story(State(state): State<AppState>) -> Json<StorySummary> {
    Json(state.story.as_ref().clone())
}

/// Returns the router for the story content context.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_story))
}
