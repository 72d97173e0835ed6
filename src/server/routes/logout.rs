//! Explicit session invalidation.

use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;

use crate::server::session::{removal_cookie, BoundSession, SESSION_COOKIE};
use crate::server::{AppError, AppState};
use crate::store::SessionRepository;

/// Destroys the bound session and clears its cookie.
#[tracing::instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    BoundSession(session): BoundSession,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), AppError> {
    SessionRepository::new(state.pool()).delete(&session.id).await?;
    tracing::info!(shop = %session.shop, "Session destroyed");
    Ok((jar.remove(removal_cookie(SESSION_COOKIE)), StatusCode::NO_CONTENT))
}
