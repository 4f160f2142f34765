//! Shared application state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;
use xianlu_content::application::query_handlers::StorySummary;
use xianlu_core::clock::Clock;
use xianlu_core::error::DomainError;
use xianlu_core::rng::DeterministicRng;
use xianlu_core::store::PersistenceStore;
use xianlu_narrative::NarrativeEngine;
use xianlu_session::GameSession;
use xianlu_session::application::autosave::AutosaveHandle;
use xianlu_session::application::command_handlers::restore_game;

/// One game, locked for the duration of a request.
pub type SharedGame = Arc<Mutex<GameSession>>;

/// How long a game may sit untouched before it is dropped from memory.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct LiveGame {
    game: SharedGame,
    last_seen: Instant,
}

impl LiveGame {
    fn new(session: GameSession) -> Self {
        Self {
            game: Arc::new(Mutex::new(session)),
            last_seen: Instant::now(),
        }
    }

    fn touch(&mut self) -> SharedGame {
        self.last_seen = Instant::now();
        Arc::clone(&self.game)
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<NarrativeEngine>,
    pub story: Arc<StorySummary>,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub rng: Arc<StdMutex<dyn DeterministicRng + Send>>,
    pub store: Arc<dyn PersistenceStore>,
    pub autosave: AutosaveHandle,
    games: Arc<Mutex<HashMap<Uuid, LiveGame>>>,
    idle_timeout: Duration,
    schema_notice: Option<&'static str>,
    notice_shown: Arc<AtomicBool>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        engine: Arc<NarrativeEngine>,
        story: StorySummary,
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Arc<StdMutex<dyn DeterministicRng + Send>>,
        store: Arc<dyn PersistenceStore>,
        autosave: AutosaveHandle,
    ) -> Self {
        Self {
            engine,
            story: Arc::new(story),
            clock,
            rng,
            store,
            autosave,
            games: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            schema_notice: None,
            notice_shown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the message shown once, on the next game started, after a save
    /// schema wipe.
    #[must_use]
    pub fn with_schema_notice(mut self, notice: Option<&'static str>) -> Self {
        self.schema_notice = notice;
        self
    }

    /// Sets how long an untouched game stays in memory. Evicted games are
    /// restored from their autosave on the next request, so this must be
    /// well above the autosave debounce.
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// The schema notice, the first time it is asked for.
    #[must_use]
    pub fn take_schema_notice(&self) -> Option<&'static str> {
        self.schema_notice
            .filter(|_| !self.notice_shown.swap(true, Ordering::SeqCst))
    }

    /// Registers a newly started game.
    pub async fn insert_game(&self, session: GameSession) -> SharedGame {
        let id = session.id;
        let mut games = self.games.lock().await;
        self.evict_idle(&mut games);
        let mut live = LiveGame::new(session);
        let game = live.touch();
        games.insert(id, live);
        game
    }

    /// Looks up a game, restoring it from its last autosave if it is not in
    /// memory.
    ///
    /// The game map is not locked while the save is loaded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::GameNotFound` if the game is neither live nor
    /// saved, or whatever restoring it fails with.
    pub async fn game(&self, id: Uuid) -> Result<SharedGame, DomainError> {
        if let Some(live) = self.games.lock().await.get_mut(&id) {
            return Ok(live.touch());
        }

        let session = restore_game(id, Arc::clone(&self.engine), self.store.as_ref()).await?;
        let mut games = self.games.lock().await;
        self.evict_idle(&mut games);
        // A concurrent restore of the same id may have won the race.
        Ok(games
            .entry(id)
            .or_insert_with(|| LiveGame::new(session))
            .touch())
    }

    /// Number of games currently held in memory.
    pub async fn live_game_count(&self) -> usize {
        self.games.lock().await.len()
    }

    /// Drops games untouched for longer than the idle timeout. A game some
    /// request still holds is kept.
    fn evict_idle(&self, games: &mut HashMap<Uuid, LiveGame>) {
        let before = games.len();
        games.retain(|_, live| {
            Arc::strong_count(&live.game) > 1 || live.last_seen.elapsed() < self.idle_timeout
        });
        let evicted = before - games.len();
        if evicted > 0 {
            debug!(evicted, remaining = games.len(), "evicted idle games");
        }
    }
}
