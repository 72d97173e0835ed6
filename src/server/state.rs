//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::clients::{HttpClient, HttpError};
use crate::config::AppConfig;

/// Application state shared across all handlers.
///
/// Cloning is cheap; every clone points at the same configuration, pool and
/// upstream client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: SqlitePool,
    http: HttpClient,
}

impl AppState {
    /// Builds the state and the shared upstream client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the upstream client cannot be constructed.
    pub fn new(config: AppConfig, pool: SqlitePool) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config)?;
        Ok(Self {
            inner: Arc::new(AppStateInner { config, pool, http }),
        })
    }

    /// Get the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the database pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get the upstream HTTP client.
    #[must_use]
    pub fn http(&self) -> &HttpClient {
        &self.inner.http
    }
}

// Verify AppState is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AppState>();
};
