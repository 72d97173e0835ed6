//! Install handshake endpoints.
//!
//! - `GET /install?shop=` issues a state cookie and redirects to the upstream
//!   authorization page
//! - `GET /install/callback` verifies the redirect back, resolves the shop's
//!   access token and binds a session

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;

use crate::auth::oauth::{begin_auth, validate_auth_callback, CallbackContext, CallbackQuery, OAuthError};
use crate::config::ShopDomain;
use crate::server::session::{removal_cookie, session_cookie, state_cookie, STATE_COOKIE};
use crate::server::{AppError, AppState};

/// Where the browser lands after a completed install.
pub const APP_PATH: &str = "/app";

const MISSING_SHOP_MESSAGE: &str =
    "Missing shop parameter. Please add ?shop=your-development-shop.myshopify.com to your request";

/// Query parameters of `GET /install`.
#[derive(Debug, Deserialize)]
pub struct InstallParams {
    shop: Option<String>,
}

/// A `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

/// Starts an install for `shop`.
#[tracing::instrument(skip_all)]
pub async fn begin(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<InstallParams>,
) -> Result<(CookieJar, Response), AppError> {
    let raw_shop = params
        .shop
        .as_deref()
        .map(str::trim)
        .filter(|shop| !shop.is_empty())
        .ok_or_else(|| AppError::ClientInput(MISSING_SHOP_MESSAGE.to_string()))?;
    let shop = ShopDomain::new(raw_shop).map_err(|e| AppError::ClientInput(e.to_string()))?;

    let result = begin_auth(state.config(), &shop);
    let jar = jar.add(state_cookie(
        result.state.as_ref(),
        state.config().state_lifetime(),
    ));

    tracing::info!(shop = %shop, "Redirecting to authorization page");
    Ok((jar, found(&result.auth_url)))
}

/// Completes an install from the upstream redirect.
///
/// Every outcome past the CSRF check clears the state cookie.
#[tracing::instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let query = CallbackQuery::new(params);
    let expected_state = jar.get(STATE_COOKIE).map(Cookie::value).map(str::to_owned);
    let ctx = CallbackContext::new(state.config(), state.http(), state.pool());

    match validate_auth_callback(&ctx, &query, expected_state.as_deref()).await {
        Ok(session) => {
            let jar = jar
                .remove(removal_cookie(STATE_COOKIE))
                .add(session_cookie(&session, state.config().session_lifetime()));
            Ok((jar, found(APP_PATH)).into_response())
        }
        Err(e @ (OAuthError::StateMismatch | OAuthError::StateReused)) => Err(e.into()),
        Err(e) => {
            let jar = jar.remove(removal_cookie(STATE_COOKIE));
            Ok((jar, AppError::from(e)).into_response())
        }
    }
}
