//! Consumed install state ledger.
//!
//! Every install state may complete exactly one callback. Consuming a state
//! inserts it into the ledger; a second insert of the same value is detected
//! through the primary key, so concurrent replays cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::RepositoryError;

/// How long consumed states are remembered.
///
/// Far longer than any state cookie lives, so a pruned state can only come
/// back with a cookie the browser has long discarded.
pub const CONSUMED_STATE_RETENTION_HOURS: i64 = 24;

/// Repository for the consumed install state ledger.
pub struct InstallStateRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InstallStateRepository<'a> {
    /// Create a new install state repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Mark `state` as consumed.
    ///
    /// Returns `true` if this call consumed the state and `false` if it had
    /// already been consumed. Entries older than the retention window are
    /// pruned first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn consume(&self, state: &str, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let cutoff = now - chrono::Duration::hours(CONSUMED_STATE_RETENTION_HOURS);
        sqlx::query("DELETE FROM consumed_install_states WHERE consumed_at < ?")
            .bind(cutoff.timestamp())
            .execute(self.pool)
            .await?;

        let result = sqlx::query(
            r"
            INSERT INTO consumed_install_states (state, consumed_at)
            VALUES (?, ?)
            ON CONFLICT(state) DO NOTHING
            ",
        )
        .bind(state)
        .bind(now.timestamp())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
