//! Authorization code exchange.
//!
//! This module provides [`exchange_code`], which trades the one-time
//! authorization code from an install callback for a permanent access token.
//!
//! # Wire Format
//!
//! `POST {base}/admin/oauth/access_token` with a JSON body:
//!
//! ```json
//! { "client_id": "...", "client_secret": "...", "code": "..." }
//! ```
//!
//! A successful response carries `access_token` and the granted `scope`.

use serde::{Deserialize, Serialize};

use crate::auth::oauth::error::OAuthError;
use crate::clients::{HttpClient, HttpError};
use crate::config::{AppConfig, ShopDomain};

/// Path of the token endpoint on the shop host.
pub const ACCESS_TOKEN_PATH: &str = "/admin/oauth/access_token";

/// Request body for token exchange.
#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// Successful token endpoint response.
#[derive(Clone, Deserialize)]
pub struct AccessTokenResponse {
    /// The permanent access token.
    pub access_token: String,
    /// Comma-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Exchanges an authorization code for an access token.
///
/// # Errors
///
/// Returns [`OAuthError::TokenExchangeFailed`] if the request fails at the
/// transport level (status `0`), the endpoint answers with a non-2xx status,
/// or the response carries no usable `access_token`.
#[tracing::instrument(skip_all, fields(shop = %shop))]
pub async fn exchange_code(
    client: &HttpClient,
    config: &AppConfig,
    shop: &ShopDomain,
    code: &str,
) -> Result<AccessTokenResponse, OAuthError> {
    let request_body = TokenExchangeRequest {
        client_id: config.api_key().as_ref(),
        client_secret: config.api_secret_key().as_ref(),
        code,
    };

    let body = client
        .post_json(shop, ACCESS_TOKEN_PATH, &request_body)
        .await
        .map_err(|e| match e {
            HttpError::Response(response) => OAuthError::TokenExchangeFailed {
                status: response.code,
                message: response.message,
            },
            HttpError::InvalidBody { reason } => OAuthError::TokenExchangeFailed {
                status: 200,
                message: format!("Failed to parse token response: {reason}"),
            },
            HttpError::Network(e) => OAuthError::TokenExchangeFailed {
                status: 0,
                message: format!("Network error: {e}"),
            },
        })?;

    let token: AccessTokenResponse =
        serde_json::from_value(body).map_err(|e| OAuthError::TokenExchangeFailed {
            status: 200,
            message: format!("Failed to parse token response: {e}"),
        })?;

    if token.access_token.trim().is_empty() {
        return Err(OAuthError::TokenExchangeFailed {
            status: 200,
            message: "Token response carried an empty access_token".to_string(),
        });
    }

    tracing::info!(scope = token.scope.as_deref().unwrap_or(""), "Exchanged authorization code");
    Ok(token)
}
