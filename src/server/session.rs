//! Session binding for request handlers.
//!
//! [`BoundSession`] resolves the `session` cookie to a live [`Session`]. The
//! cookie helpers here are the only place the gateway's cookie attributes are
//! decided.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

use super::{AppError, AppState};
use crate::auth::Session;
use crate::store::SessionRepository;

/// Name of the cookie carrying the install state.
pub const STATE_COOKIE: &str = "state";

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session";

/// Extractor that requires a live session.
///
/// Rejects with [`AppError::SessionMissing`] when the cookie is absent or
/// names an unknown or expired session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(BoundSession(session): BoundSession) -> String {
///     session.shop.to_string()
/// }
/// ```
pub struct BoundSession(pub Session);

impl FromRequestParts<AppState> for BoundSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let id = jar
            .get(SESSION_COOKIE)
            .map(Cookie::value)
            .filter(|value| !value.is_empty())
            .ok_or(AppError::SessionMissing)?;

        let session = SessionRepository::new(state.pool())
            .find_active(id, Utc::now())
            .await?
            .ok_or(AppError::SessionMissing)?;

        Ok(Self(session))
    }
}

fn secure_cookie(name: &'static str, value: String, max_age: chrono::Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Cookie holding a freshly issued install state.
#[must_use]
pub fn state_cookie(state: &str, lifetime: chrono::Duration) -> Cookie<'static> {
    secure_cookie(STATE_COOKIE, state.to_owned(), lifetime)
}

/// Cookie holding a newly bound session id.
#[must_use]
pub fn session_cookie(session: &Session, lifetime: chrono::Duration) -> Cookie<'static> {
    secure_cookie(SESSION_COOKIE, session.id.clone(), lifetime)
}

/// Removal template for `name`; the path must match the issued cookie.
#[must_use]
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}
