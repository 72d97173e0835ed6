//! Install callback query parameters.
//!
//! This module provides [`CallbackQuery`], the raw parameter list the
//! platform sends back to `/install/callback`, along with the canonical
//! signable string used for signature verification.
//!
//! Parameters are kept as an ordered list of pairs rather than a fixed struct
//! because the signature covers every parameter the platform sends, including
//! ones this gateway never reads (`host`, `timestamp` and whatever else is
//! added later).
//!
//! # Canonical Form
//!
//! The signable string is built by:
//!
//! 1. Dropping the `hmac` and `signature` parameters
//! 2. Escaping `%` and `&` in keys and values, and `=` in keys
//! 3. Sorting the `key=value` pairs lexicographically
//! 4. Joining them with `&`
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::auth::oauth::CallbackQuery;
//!
//! let query = CallbackQuery::new(vec![
//!     ("shop".to_string(), "foo.example".to_string()),
//!     ("code".to_string(), "abc123".to_string()),
//!     ("hmac".to_string(), "deadbeef".to_string()),
//! ]);
//!
//! assert_eq!(query.to_signable_string(), "code=abc123&shop=foo.example");
//! assert_eq!(query.hmac(), Some("deadbeef"));
//! ```

/// Parameters that carry signatures and are excluded from the signed message.
const SIGNATURE_PARAMS: [&str; 2] = ["hmac", "signature"];

/// Query parameters received on the install callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    params: Vec<(String, String)>,
}

// Verify CallbackQuery is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CallbackQuery>();
};

impl CallbackQuery {
    /// Wraps the decoded query pairs in request order.
    #[must_use]
    pub const fn new(params: Vec<(String, String)>) -> Self {
        Self { params }
    }

    /// Returns the first value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first non-blank value for `key`.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }

    /// The shop domain as sent, unvalidated.
    #[must_use]
    pub fn shop(&self) -> Option<&str> {
        self.get_non_empty("shop")
    }

    /// The one-time authorization code.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.get_non_empty("code")
    }

    /// The echoed install state.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.get("state")
    }

    /// The hex-encoded signature over the other parameters.
    #[must_use]
    pub fn hmac(&self) -> Option<&str> {
        self.get_non_empty("hmac")
    }

    /// Builds the canonical string the signature is computed over.
    #[must_use]
    pub fn to_signable_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(key, _)| !SIGNATURE_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| (escape_key(key), escape_value(value)))
            .collect();

        // Ordered by key, then value; never by the rendered `key=value`.
        pairs.sort_unstable();
        pairs
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn escape_value(raw: &str) -> String {
    raw.replace('%', "%25").replace('&', "%26")
}

fn escape_key(raw: &str) -> String {
    escape_value(raw).replace('=', "%3D")
}
