//! Per-shop access token repository.
//!
//! Holds at most one access token per shop. Writes are upserts keyed by the
//! shop domain, so concurrent installs of the same shop converge on a single
//! row with the last writer's token.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{timestamp_to_datetime, RepositoryError};
use crate::config::ShopDomain;

// =============================================================================
// Types
// =============================================================================

/// A stored access token.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The shop this token belongs to.
    pub shop: ShopDomain,
    /// Access token for upstream calls (redacted in debug output).
    pub access_token: String,
    /// Comma-separated granted scopes.
    pub scope: String,
    /// When the token was obtained.
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Internal row type for `SQLite` queries.
#[derive(Debug, sqlx::FromRow)]
struct AccessTokenRow {
    shop: String,
    access_token: String,
    scope: String,
    issued_at: i64,
}

impl TryFrom<AccessTokenRow> for AccessToken {
    type Error = RepositoryError;

    fn try_from(row: AccessTokenRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::new(&row.shop).map_err(|_| {
            RepositoryError::DataCorruption(format!("stored shop is not a valid domain: {}", row.shop))
        })?;

        Ok(Self {
            shop,
            access_token: row.access_token,
            scope: row.scope,
            issued_at: timestamp_to_datetime("issued_at", row.issued_at)?,
        })
    }
}

/// Reduce a lookup result to zero or one record.
///
/// The schema keys tokens by shop, so more than one row means the store was
/// tampered with or migrated incorrectly; that is reported rather than
/// silently picking a row.
fn at_most_one<T>(mut rows: Vec<T>, shop: &ShopDomain) -> Result<Option<T>, RepositoryError> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        n => Err(RepositoryError::DataCorruption(format!(
            "{n} access tokens stored for {shop}"
        ))),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for access token database operations.
pub struct AccessTokenRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccessTokenRepository<'a> {
    /// Create a new access token repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the token for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if more than one row matches or the
    /// row cannot be decoded.
    pub async fn find_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<AccessToken>, RepositoryError> {
        let rows: Vec<AccessTokenRow> = sqlx::query_as(
            r"
            SELECT shop, access_token, scope, issued_at
            FROM access_tokens
            WHERE shop = ?
            ",
        )
        .bind(shop.as_ref())
        .fetch_all(self.pool)
        .await?;

        at_most_one(rows, shop)?
            .map(AccessToken::try_from)
            .transpose()
    }

    /// Save or update the token for a shop.
    ///
    /// Uses upsert to handle both new and existing tokens.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(
        &self,
        shop: &ShopDomain,
        access_token: &str,
        scope: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO access_tokens (shop, access_token, scope, issued_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(shop) DO UPDATE SET
                access_token = excluded.access_token,
                scope = excluded.scope,
                issued_at = excluded.issued_at
            ",
        )
        .bind(shop.as_ref())
        .bind(access_token)
        .bind(scope)
        .bind(issued_at.timestamp())
        .execute(self.pool)
        .await?;

        tracing::debug!(shop = %shop, "Stored access token");
        Ok(())
    }
}
