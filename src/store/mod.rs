//! Persistence for credentials, sessions and consumed install states.
//!
//! # Database: `SQLite`
//!
//! ## Tables
//!
//! - `access_tokens` - One access token per shop, keyed by shop domain
//! - `sessions` - Browser sessions bound after a successful install
//! - `consumed_install_states` - Install states that already completed a callback
//!
//! All timestamps are stored as unix seconds.
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are embedded into the binary; they run
//! at startup through [`migrate`].

pub mod access_tokens;
pub mod install_states;
pub mod sessions;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

pub use access_tokens::{AccessToken, AccessTokenRepository};
pub use install_states::InstallStateRepository;
pub use sessions::SessionRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `SQLite` connection pool.
///
/// The database file is created if it does not exist.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails to apply.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Convert a stored unix timestamp back into a `DateTime`.
pub(crate) fn timestamp_to_datetime(
    column: &str,
    secs: i64,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        RepositoryError::DataCorruption(format!("{column} is out of range: {secs}"))
    })
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = create_pool("sqlite::memory:", 1)
        .await
        .expect("in-memory pool");
    migrate(&pool).await.expect("migrations apply");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_create_all_tables() {
        let pool = test_pool().await;

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert!(tables.contains(&"access_tokens".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
        assert!(tables.contains(&"consumed_install_states".to_string()));
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let pool = test_pool().await;
        migrate(&pool).await.unwrap();
    }

    #[test]
    fn test_timestamp_to_datetime_round_trips_seconds() {
        let dt = timestamp_to_datetime("issued_at", 1_700_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_timestamp_to_datetime_rejects_out_of_range() {
        let result = timestamp_to_datetime("expires_at", i64::MAX);
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }
}
