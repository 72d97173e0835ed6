//! # Storefront App Install Gateway
//!
//! Server side of a storefront app install: the merchant is redirected to
//! the platform's authorization page, the redirect back is verified, the
//! authorization code is exchanged once for a long-lived access token, and a
//! browser session is bound to the shop. Bound sessions may then read the
//! shop's products through an authenticated proxy.
//!
//! ## Overview
//!
//! - Type-safe configuration via [`AppConfig`] and [`AppConfigBuilder`]
//! - Validated newtypes for API credentials, shop domains and URLs
//! - The install handshake in [`auth::oauth`]: CSRF state, HMAC verification
//!   and token exchange
//! - `SQLite` persistence for credentials and sessions in [`store`]
//! - Upstream calls and the resource proxy in [`clients`]
//! - The axum router in [`server`]
//!
//! ## Quick Start
//!
//! ```rust
//! use shop_auth_gateway::{AppConfig, ApiKey, ApiSecretKey, HostUrl};
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("your-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("your-api-secret").unwrap())
//!     .host(HostUrl::new("https://gateway.example.com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.redirect_uri(), "https://gateway.example.com/install/callback");
//! ```
//!
//! Serving the router:
//!
//! ```rust,ignore
//! let pool = shop_auth_gateway::store::create_pool(config.database_url(), 10).await?;
//! shop_auth_gateway::store::migrate(&pool).await?;
//! let app = shop_auth_gateway::server::router(AppState::new(config, pool)?);
//! axum::serve(listener, app).await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration, pool and HTTP client are passed in
//!   through [`server::AppState`]
//! - **Fail-fast validation**: newtypes validate on construction
//! - **Verification before side effects**: no callback writes anything until
//!   its state and signature have been checked
//! - **Thread-safe**: all public types are `Send + Sync`

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod store;

pub use auth::Session;
pub use config::{ApiKey, ApiSecretKey, AppConfig, AppConfigBuilder, HostUrl, ShopDomain};
pub use error::ConfigError;
pub use server::{router, AppError, AppState};
