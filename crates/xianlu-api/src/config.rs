//! Server configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use xianlu_session::application::autosave::DEFAULT_DEBOUNCE;

use crate::error::AppError;
use crate::state::DEFAULT_IDLE_TIMEOUT;

/// Everything `main` needs before it can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL save store; saves stay in memory when unset.
    pub database_url: Option<String>,
    /// Story bundle to load instead of the bundled default.
    pub story_path: Option<PathBuf>,
    pub autosave_debounce: Duration,
    /// How long an untouched game stays in memory.
    pub game_idle_timeout: Duration,
}

impl ServerConfig {
    /// Reads `HOST`, `PORT`, `DATABASE_URL`, `STORY_PATH`,
    /// `AUTOSAVE_DEBOUNCE_MS` and `GAME_IDLE_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let autosave_debounce = match non_empty("AUTOSAVE_DEBOUNCE_MS") {
            Some(raw) => raw.parse().map(Duration::from_millis).map_err(|e| {
                AppError::Config(format!("AUTOSAVE_DEBOUNCE_MS must be milliseconds: {e}"))
            })?,
            None => DEFAULT_DEBOUNCE,
        };
        let game_idle_timeout = match non_empty("GAME_IDLE_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map(Duration::from_secs).map_err(|e| {
                AppError::Config(format!("GAME_IDLE_TIMEOUT_SECS must be seconds: {e}"))
            })?,
            None => DEFAULT_IDLE_TIMEOUT,
        };

        Ok(Self {
            host,
            port,
            database_url: non_empty("DATABASE_URL"),
            story_path: non_empty("STORY_PATH").map(PathBuf::from),
            autosave_debounce,
            game_idle_timeout,
        })
    }

    /// `host:port` for binding.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
