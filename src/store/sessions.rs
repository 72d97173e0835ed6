//! Browser session repository.
//!
//! Sessions are looked up by their opaque id. Expiry is enforced lazily: a
//! lookup that finds an expired row deletes it and reports no session.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{timestamp_to_datetime, RepositoryError};
use crate::auth::Session;
use crate::config::ShopDomain;

/// Internal row type for `SQLite` queries.
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    shop: String,
    access_token: Option<String>,
    created_at: i64,
    expires_at: i64,
}

impl SessionRow {
    fn into_session(self, access_token: String) -> Result<Session, RepositoryError> {
        let shop = ShopDomain::new(&self.shop).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "session shop is not a valid domain: {}",
                self.shop
            ))
        })?;

        Ok(Session {
            id: self.id,
            shop,
            access_token,
            created_at: timestamp_to_datetime("created_at", self.created_at)?,
            expires: timestamp_to_datetime("expires_at", self.expires_at)?,
        })
    }
}

/// Repository for session database operations.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a newly established session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sessions (id, shop, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(&session.id)
        .bind(session.shop.as_ref())
        .bind(session.created_at.timestamp())
        .bind(session.expires.timestamp())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Find a live session by id.
    ///
    /// The access token is read from the shop's current credential. A
    /// session that has expired, or whose shop no longer has a credential,
    /// is deleted and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if the row cannot be decoded.
    pub async fn find_active(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r"
            SELECT s.id, s.shop, t.access_token, s.created_at, s.expires_at
            FROM sessions s
            LEFT JOIN access_tokens t ON t.shop = s.shop
            WHERE s.id = ?
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(mut row) = row else {
            return Ok(None);
        };

        let Some(access_token) = row.access_token.take() else {
            tracing::debug!(shop = %row.shop, "Dropping session without a stored credential");
            self.delete(id).await?;
            return Ok(None);
        };

        let session = row.into_session(access_token)?;
        if session.expired_at(now) {
            tracing::debug!(shop = %session.shop, "Dropping expired session");
            self.delete(id).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Delete a session.
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every session that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.timestamp())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
