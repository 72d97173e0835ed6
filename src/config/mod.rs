//! Configuration types for the install gateway.
//!
//! This module provides the configuration used to run the gateway: the app's
//! credentials, its public forwarding address, persistence settings and the
//! lifetimes of install states and sessions.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`AppConfig`]: The main configuration struct holding all gateway settings
//! - [`AppConfigBuilder`]: A builder for constructing [`AppConfig`] instances
//! - [`ApiKey`]: A validated API key newtype
//! - [`ApiSecretKey`]: A validated API secret key newtype with masked debug output
//! - [`ShopDomain`]: A validated storefront host name
//! - [`HostUrl`]: A validated absolute URL
//!
//! Configuration can be built programmatically or loaded from the process
//! environment with [`AppConfig::from_env`].
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::{AppConfig, ApiKey, ApiSecretKey, HostUrl};
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("my-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("my-secret").unwrap())
//!     .host(HostUrl::new("https://myapp.example.com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.redirect_uri(), "https://myapp.example.com/install/callback");
//! ```

mod newtypes;

pub use newtypes::{ApiKey, ApiSecretKey, HostUrl, ShopDomain};

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Path of the install callback, appended to the forwarding address.
pub const CALLBACK_PATH: &str = "/install/callback";

const DEFAULT_DATABASE_URL: &str = "sqlite://shop_auth.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_LIFETIME_SECS: i64 = 86_400;
const DEFAULT_STATE_LIFETIME_SECS: i64 = 600;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Configuration for the install gateway.
///
/// # Thread Safety
///
/// `AppConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across handlers and async tasks.
///
/// # Key Rotation
///
/// The `old_api_secret_key` field supports seamless key rotation. When
/// validating callback signatures, the gateway tries the primary key first,
/// then falls back to the old key if configured. This allows in-flight
/// installs to complete while the secret is being rotated.
///
/// # Upstream Host
///
/// Upstream calls go to `https://<shop>` unless an `api_host` override is
/// configured, in which case every shop is served from that base URL.
#[derive(Clone, Debug)]
pub struct AppConfig {
    api_key: ApiKey,
    api_secret_key: ApiSecretKey,
    old_api_secret_key: Option<ApiSecretKey>,
    host: HostUrl,
    api_host: Option<HostUrl>,
    database_url: String,
    bind_addr: SocketAddr,
    session_lifetime: chrono::Duration,
    state_lifetime: chrono::Duration,
    connect_timeout: Duration,
    request_timeout: Duration,
    max_connections: u32,
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    /// Loads configuration from the process environment.
    ///
    /// Required variables: `SHOPIFY_API_KEY`, `SHOPIFY_API_SECRET` and
    /// `FORWARDING_ADDRESS`. Optional variables fall back to the builder
    /// defaults: `SHOPIFY_OLD_API_SECRET`, `SHOPIFY_API_HOST`, `DATABASE_URL`,
    /// `BIND_ADDR`, `SESSION_LIFETIME_SECS`, `STATE_LIFETIME_SECS`,
    /// `UPSTREAM_CONNECT_TIMEOUT_SECS`, `UPSTREAM_TIMEOUT_SECS` and
    /// `DATABASE_MAX_CONNECTIONS`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if a required variable is unset,
    /// [`ConfigError::InvalidEnvVar`] if a numeric or address variable cannot
    /// be parsed, or a validation error from the corresponding newtype.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// [`AppConfig::from_env`] delegates here with `std::env::var`.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingEnvVar { name })
        };
        let optional = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut builder = AppConfigBuilder::new()
            .api_key(ApiKey::new(required("SHOPIFY_API_KEY")?)?)
            .api_secret_key(ApiSecretKey::new(required("SHOPIFY_API_SECRET")?)?)
            .host(HostUrl::new(required("FORWARDING_ADDRESS")?)?);

        if let Some(old) = optional("SHOPIFY_OLD_API_SECRET") {
            builder = builder.old_api_secret_key(ApiSecretKey::new(old)?);
        }
        if let Some(api_host) = optional("SHOPIFY_API_HOST") {
            builder = builder.api_host(HostUrl::new(api_host)?);
        }
        if let Some(url) = optional("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(addr) = optional("BIND_ADDR") {
            builder = builder.bind_addr(parse_var("BIND_ADDR", &addr)?);
        }
        if let Some(secs) = optional("SESSION_LIFETIME_SECS") {
            let secs: u32 = parse_positive("SESSION_LIFETIME_SECS", &secs)?;
            builder = builder.session_lifetime(chrono::Duration::seconds(i64::from(secs)));
        }
        if let Some(secs) = optional("STATE_LIFETIME_SECS") {
            let secs: u32 = parse_positive("STATE_LIFETIME_SECS", &secs)?;
            builder = builder.state_lifetime(chrono::Duration::seconds(i64::from(secs)));
        }
        if let Some(secs) = optional("UPSTREAM_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = parse_positive("UPSTREAM_CONNECT_TIMEOUT_SECS", &secs)?;
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = optional("UPSTREAM_TIMEOUT_SECS") {
            let secs: u64 = parse_positive("UPSTREAM_TIMEOUT_SECS", &secs)?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(max) = optional("DATABASE_MAX_CONNECTIONS") {
            builder = builder.max_connections(parse_positive("DATABASE_MAX_CONNECTIONS", &max)?);
        }

        builder.build()
    }

    /// Returns the API key.
    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Returns the API secret key.
    #[must_use]
    pub const fn api_secret_key(&self) -> &ApiSecretKey {
        &self.api_secret_key
    }

    /// Returns the old API secret key, if configured.
    ///
    /// This is used during key rotation to validate callback signatures
    /// created with the previous secret key.
    #[must_use]
    pub const fn old_api_secret_key(&self) -> Option<&ApiSecretKey> {
        self.old_api_secret_key.as_ref()
    }

    /// Returns the app's public forwarding address.
    #[must_use]
    pub const fn host(&self) -> &HostUrl {
        &self.host
    }

    /// Returns the upstream host override, if configured.
    #[must_use]
    pub const fn api_host(&self) -> Option<&HostUrl> {
        self.api_host.as_ref()
    }

    /// Returns the callback URL registered with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        self.host.join(CALLBACK_PATH)
    }

    /// Returns the base URL for upstream calls on behalf of `shop`.
    #[must_use]
    pub fn upstream_base_uri(&self, shop: &ShopDomain) -> String {
        upstream_base_uri(self.api_host.as_ref(), shop)
    }

    /// Returns the database connection URL.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Returns the address the HTTP server binds to.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Returns how long a bound session stays valid.
    #[must_use]
    pub const fn session_lifetime(&self) -> chrono::Duration {
        self.session_lifetime
    }

    /// Returns how long an install state stays valid.
    #[must_use]
    pub const fn state_lifetime(&self) -> chrono::Duration {
        self.state_lifetime
    }

    /// Returns the upstream connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the overall upstream request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the maximum size of the database pool.
    #[must_use]
    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

// Verify AppConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AppConfig>();
};

/// Computes the upstream base URL for a shop.
///
/// With an override the override wins, otherwise the shop domain itself is
/// the host.
#[must_use]
pub fn upstream_base_uri(api_host: Option<&HostUrl>, shop: &ShopDomain) -> String {
    api_host.map_or_else(
        || format!("https://{}", shop.as_ref()),
        |host| host.as_ref().to_string(),
    )
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
        name,
        value: value.to_string(),
    })
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
{
    let parsed: T = parse_var(name, value)?;
    if parsed == T::default() {
        return Err(ConfigError::InvalidEnvVar {
            name,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

/// Builder for constructing [`AppConfig`] instances.
///
/// Required fields are `api_key`, `api_secret_key` and `host`. All other
/// fields have sensible defaults.
///
/// # Defaults
///
/// - `database_url`: `sqlite://shop_auth.db?mode=rwc`
/// - `bind_addr`: `0.0.0.0:3000`
/// - `session_lifetime`: 24 hours
/// - `state_lifetime`: 10 minutes
/// - `connect_timeout`: 5 seconds
/// - `request_timeout`: 15 seconds
/// - `max_connections`: 10
/// - `api_host`, `old_api_secret_key`: `None`
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    api_key: Option<ApiKey>,
    api_secret_key: Option<ApiSecretKey>,
    old_api_secret_key: Option<ApiSecretKey>,
    host: Option<HostUrl>,
    api_host: Option<HostUrl>,
    database_url: Option<String>,
    bind_addr: Option<SocketAddr>,
    session_lifetime: Option<chrono::Duration>,
    state_lifetime: Option<chrono::Duration>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    max_connections: Option<u32>,
}

impl AppConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key (required).
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API secret key (required).
    #[must_use]
    pub fn api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.api_secret_key = Some(key);
        self
    }

    /// Sets the old API secret key for key rotation support.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shop_auth_gateway::{AppConfig, ApiKey, ApiSecretKey, HostUrl};
    ///
    /// let config = AppConfig::builder()
    ///     .api_key(ApiKey::new("key").unwrap())
    ///     .api_secret_key(ApiSecretKey::new("new-secret").unwrap())
    ///     .old_api_secret_key(ApiSecretKey::new("old-secret").unwrap())
    ///     .host(HostUrl::new("https://myapp.example.com").unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(config.old_api_secret_key().is_some());
    /// ```
    #[must_use]
    pub fn old_api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.old_api_secret_key = Some(key);
        self
    }

    /// Sets the app's public forwarding address (required).
    #[must_use]
    pub fn host(mut self, host: HostUrl) -> Self {
        self.host = Some(host);
        self
    }

    /// Routes every upstream call to this base URL instead of `https://<shop>`.
    #[must_use]
    pub fn api_host(mut self, host: HostUrl) -> Self {
        self.api_host = Some(host);
        self
    }

    /// Sets the database connection URL.
    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the address the HTTP server binds to.
    #[must_use]
    pub const fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Sets how long a bound session stays valid.
    #[must_use]
    pub const fn session_lifetime(mut self, lifetime: chrono::Duration) -> Self {
        self.session_lifetime = Some(lifetime);
        self
    }

    /// Sets how long an install state stays valid.
    #[must_use]
    pub const fn state_lifetime(mut self, lifetime: chrono::Duration) -> Self {
        self.state_lifetime = Some(lifetime);
        self
    }

    /// Sets the upstream connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the overall upstream request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the maximum size of the database pool.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Builds the [`AppConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `api_key`,
    /// `api_secret_key` or `host` are not set.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let api_secret_key = self
            .api_secret_key
            .ok_or(ConfigError::MissingRequiredField {
                field: "api_secret_key",
            })?;
        let host = self
            .host
            .ok_or(ConfigError::MissingRequiredField { field: "host" })?;

        let bind_addr = match self.bind_addr {
            Some(addr) => addr,
            None => parse_var("BIND_ADDR", DEFAULT_BIND_ADDR)?,
        };

        Ok(AppConfig {
            api_key,
            api_secret_key,
            old_api_secret_key: self.old_api_secret_key,
            host,
            api_host: self.api_host,
            database_url: self
                .database_url
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr,
            session_lifetime: self
                .session_lifetime
                .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_SESSION_LIFETIME_SECS)),
            state_lifetime: self
                .state_lifetime
                .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_STATE_LIFETIME_SECS)),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
        })
    }
}
