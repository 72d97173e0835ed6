//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use std::fmt;

/// The app's public client identifier.
///
/// This newtype ensures the API key is non-empty and provides type safety
/// to prevent accidental misuse of raw strings.
///
/// # Example
///
/// ```rust
/// use shop_auth_gateway::ApiKey;
///
/// let key = ApiKey::new("my-api-key").unwrap();
/// assert_eq!(key.as_ref(), "my-api-key");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Creates a new validated API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKey`] if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The app's shared secret, used both for callback signatures and token exchange.
///
/// The `Debug` implementation masks the secret value, displaying only
/// `ApiSecretKey(*****)` instead of the actual key.
///
/// # Example
///
/// ```rust
/// use shop_auth_gateway::ApiSecretKey;
///
/// let secret = ApiSecretKey::new("my-secret").unwrap();
/// assert_eq!(format!("{:?}", secret), "ApiSecretKey(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecretKey(String);

impl ApiSecretKey {
    /// Creates a new validated API secret key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiSecretKey`] if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiSecretKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiSecretKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecretKey(*****)")
    }
}

/// A validated storefront domain, the tenant key for credentials and sessions.
///
/// The domain is trimmed and lower-cased, then checked to be a plain DNS host
/// name: at least two dot-separated labels made of ASCII letters, digits and
/// hyphens, with no label starting or ending in a hyphen. Ports, paths,
/// credentials and query strings are all rejected, so a shop value can never
/// steer an upstream request anywhere but `https://<shop>`.
///
/// # Example
///
/// ```rust
/// use shop_auth_gateway::ShopDomain;
///
/// let domain = ShopDomain::new("My-Store.myshopify.com").unwrap();
/// assert_eq!(domain.as_ref(), "my-store.myshopify.com");
///
/// assert!(ShopDomain::new("evil.example/admin").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShopDomain {
    full_domain: String,
}

impl ShopDomain {
    const MAX_LEN: usize = 255;
    const MAX_LABEL_LEN: usize = 63;

    /// Creates a new validated shop domain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShopDomain`] if the domain is invalid.
    pub fn new(domain: impl Into<String>) -> Result<Self, ConfigError> {
        let domain = domain.into();
        let domain = domain.trim().to_lowercase();

        if domain.is_empty() || domain.len() > Self::MAX_LEN {
            return Err(ConfigError::InvalidShopDomain { domain });
        }

        let label_count = domain.split('.').count();

        if label_count < 2 || !domain.split('.').all(Self::is_valid_label) {
            return Err(ConfigError::InvalidShopDomain { domain });
        }

        Ok(Self {
            full_domain: domain,
        })
    }

    fn is_valid_label(label: &str) -> bool {
        if label.is_empty() || label.len() > Self::MAX_LABEL_LEN {
            return false;
        }

        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }

        label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.full_domain
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_domain)
    }
}

/// A validated absolute `http(s)` URL.
///
/// Used for the app's public forwarding address (the base of the redirect
/// target) and for the optional upstream host override.
///
/// # Example
///
/// ```rust
/// use shop_auth_gateway::HostUrl;
///
/// let url = HostUrl::new("https://myapp.example.com/").unwrap();
/// assert_eq!(url.join("/install/callback"), "https://myapp.example.com/install/callback");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl {
    url: String,
}

impl HostUrl {
    /// Creates a new validated host URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostUrl`] if the URL is invalid.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();

        let scheme_end = url
            .find("://")
            .ok_or_else(|| ConfigError::InvalidHostUrl { url: url.clone() })?;

        let scheme = &url[..scheme_end];
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidHostUrl { url: url.clone() });
        }

        let authority = &url[scheme_end + 3..];
        if authority.is_empty() || authority.starts_with([':', '/', '?', '#']) {
            return Err(ConfigError::InvalidHostUrl { url: url.clone() });
        }

        Ok(Self { url })
    }

    /// Appends an absolute path to this URL.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}
