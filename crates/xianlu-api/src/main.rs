//! Xianlu API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use xianlu_api::config::ServerConfig;
use xianlu_api::error::AppError;
use xianlu_api::state::AppState;
use xianlu_content::application::query_handlers::story_summary;
use xianlu_content::domain::commands::{IngestStory, StorySource};
use xianlu_content::handle_ingest_story;
use xianlu_core::clock::{Clock, SystemClock};
use xianlu_core::rng::{DeterministicRng, StdRngSource};
use xianlu_core::store::PersistenceStore;
use xianlu_save_store::{MemoryStore, PgSaveStore};
use xianlu_session::application::autosave::spawn_autosave;
use xianlu_session::application::command_handlers::LAST_SAVE_KEY;
use xianlu_session::ensure_schema;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Xianlu API server");

    let config = ServerConfig::from_env()?;

    // Load and validate the story before accepting traffic.
    let source = match &config.story_path {
        Some(path) => StorySource::Path(path.clone()),
        None => StorySource::Bundled,
    };
    let story = handle_ingest_story(&IngestStory {
        correlation_id: Uuid::new_v4(),
        source,
    })?;
    for issue in &story.warnings {
        tracing::warn!(%issue, "story warning");
    }
    tracing::info!(
        title = %story.title,
        version = %story.version_hash,
        warnings = story.warnings.len(),
        "story loaded"
    );

    // Pick the save store.
    let store: Arc<dyn PersistenceStore> = match &config.database_url {
        Some(url) => Arc::new(PgSaveStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; saves are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let schema = ensure_schema(store.as_ref(), LAST_SAVE_KEY).await?;
    tracing::info!(?schema, "save schema checked");

    let (autosave, autosave_task) = spawn_autosave(Arc::clone(&store), config.autosave_debounce);

    // Build application state.
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(StdRngSource::from_os()));
    let summary = story_summary(&story);
    let app_state = AppState::new(
        Arc::new(story.engine),
        summary,
        clock,
        rng,
        store,
        autosave,
    )
    .with_schema_notice(schema.notice())
    .with_idle_timeout(config.game_idle_timeout);

    let app = xianlu_api::build_router(app_state);

    // Start server.
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Router (and with it every autosave handle) is gone; wait for the final flush.
    if let Err(e) = autosave_task.await {
        tracing::warn!(error = %e, "autosave worker did not shut down cleanly");
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
