//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use xianlu_content::application::query_handlers::story_summary;
use xianlu_content::load_bundled_story;
use xianlu_core::clock::Clock;
use xianlu_core::rng::DeterministicRng;
use xianlu_core::store::PersistenceStore;
use xianlu_session::application::autosave::{AutosaveHandle, spawn_autosave};
use xianlu_test_support::{FixedClock, MockRng, RecordingStore};

use xianlu_api::build_router;
use xianlu_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over the bundled story, an in-memory store and
/// a deterministic Clock/RNG. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> Router {
    build_test_app_with_store(Arc::new(RecordingStore::new())).0
}

/// Build the full app router over `store`. The returned handle flushes the
/// app's autosave worker.
pub fn build_test_app_with_store(store: Arc<dyn PersistenceStore>) -> (Router, AutosaveHandle) {
    let story = load_bundled_story().unwrap();
    let summary = story_summary(&story);
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    let (autosave, _task) = spawn_autosave(Arc::clone(&store), Duration::from_millis(10));
    let app_state = AppState::new(
        Arc::new(story.engine),
        summary,
        fixed_clock(),
        rng,
        store,
        autosave.clone(),
    );

    (build_router(app_state), autosave)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Starts a game and returns its id.
pub async fn start_game(app: Router) -> String {
    let (status, json) = post_json(app, "/api/v1/games", &serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    json["gameId"].as_str().unwrap().to_owned()
}
