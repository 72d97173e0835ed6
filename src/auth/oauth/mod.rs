//! Install handshake for storefront apps.
//!
//! This module implements the authorization code grant used when a merchant
//! installs the app:
//!
//! 1. **Authorization Initiation** ([`begin_auth`]): Generate an install
//!    state and the authorization URL the merchant is redirected to.
//!
//! 2. **Callback Validation** ([`validate_auth_callback`]): When the merchant
//!    is redirected back, check the state, the parameters and the signature,
//!    resolve an access token for the shop and bind a browser session.
//!
//! # Security Features
//!
//! - **HMAC Validation**: Callbacks are verified using HMAC-SHA256 signatures
//! - **CSRF Protection**: The install state ties the callback to the browser
//!   that started the install, and each state completes at most one callback
//! - **Constant-Time Comparison**: Signature and state comparisons use
//!   constant-time algorithms to prevent timing attacks
//! - **Key Rotation Support**: An old API secret key can be configured so
//!   in-flight installs survive a secret rotation
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::auth::oauth::{begin_auth, hmac::compute_signature, CallbackQuery};
//! use shop_auth_gateway::{AppConfig, ApiKey, ApiSecretKey, HostUrl, ShopDomain};
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
//! // The platform signs the callback parameters with the shared secret.
//! let params = vec![
//!     ("code".to_string(), "abc123".to_string()),
//!     ("shop".to_string(), "foo.example".to_string()),
//!     ("state".to_string(), result.state.to_string()),
//! ];
//! let signable = CallbackQuery::new(params).to_signable_string();
//! let hmac = compute_signature(&signable, "secret");
//! assert_eq!(hmac.len(), 64);
//! ```

mod begin_auth;
mod callback_query;
mod error;
pub mod hmac;
mod state;
mod token_exchange;
mod validate_callback;

pub use begin_auth::{begin_auth, BeginAuthResult, AUTHORIZE_PATH, REQUESTED_SCOPE};
pub use callback_query::CallbackQuery;
pub use error::OAuthError;
pub use hmac::{compute_signature, constant_time_compare, validate_hmac};
pub use state::{verify_state, InstallState};
pub use token_exchange::{exchange_code, AccessTokenResponse, ACCESS_TOKEN_PATH};
pub use validate_callback::{validate_auth_callback, CallbackContext};
