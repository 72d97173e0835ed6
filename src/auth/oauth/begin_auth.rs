//! Authorization URL generation.
//!
//! This module provides the [`begin_auth`] function for generating the
//! authorization URL a merchant is redirected to, and the
//! [`BeginAuthResult`] struct containing the URL and install state.
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::{AppConfig, ApiKey, ApiSecretKey, HostUrl, ShopDomain};
//! use shop_auth_gateway::auth::oauth::begin_auth;
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("abc").unwrap())
//!     .api_secret_key(ApiSecretKey::new("secret").unwrap())
//!     .host(HostUrl::new("https://app.example.com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let shop = ShopDomain::new("foo.example").unwrap();
//! let result = begin_auth(&config, &shop);
//!
//! assert!(result.auth_url.starts_with("https://foo.example/admin/oauth/authorize?"));
//! assert!(result.auth_url.contains(result.state.as_ref()));
//! ```

use crate::auth::oauth::state::InstallState;
use crate::config::{AppConfig, ShopDomain};

/// The access scope requested at install time.
pub const REQUESTED_SCOPE: &str = "read_products";

/// Path of the authorization endpoint on the shop host.
pub const AUTHORIZE_PATH: &str = "/admin/oauth/authorize";

/// Result of initiating an install.
///
/// The `state` value **must** be stored on the client (the gateway uses an
/// `HttpOnly` cookie) and compared against the `state` parameter of the
/// callback.
#[derive(Clone, Debug)]
pub struct BeginAuthResult {
    /// The full authorization URL to redirect the merchant to.
    pub auth_url: String,

    /// The install state generated for this authorization request.
    pub state: InstallState,
}

// Verify BeginAuthResult is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BeginAuthResult>();
};

/// Starts an install for `shop`.
///
/// Generates a fresh [`InstallState`] and builds the authorization URL with
/// the app's client id, the requested scope, the state and the callback
/// redirect URI. All query values are percent-encoded.
#[must_use]
pub fn begin_auth(config: &AppConfig, shop: &ShopDomain) -> BeginAuthResult {
    let state = InstallState::new();
    let redirect_uri = config.redirect_uri();

    let params = [
        ("client_id", config.api_key().as_ref()),
        ("scope", REQUESTED_SCOPE),
        ("state", state.as_ref()),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let auth_url = format!(
        "{}{}?{}",
        config.upstream_base_uri(shop),
        AUTHORIZE_PATH,
        query_string
    );

    BeginAuthResult { auth_url, state }
}
