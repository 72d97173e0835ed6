//! Install state handling for CSRF protection.
//!
//! This module provides the [`InstallState`] type, the one-time nonce that
//! ties an install callback to the browser that started the install.
//!
//! # Overview
//!
//! `GET /install` generates a fresh state, stores it in a short-lived cookie
//! and echoes it in the authorization URL. The callback is only accepted if
//! the echoed `state` parameter equals the cookie value, compared in
//! constant time by [`verify_state`].
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::auth::oauth::{verify_state, InstallState};
//!
//! let state = InstallState::new();
//! assert_eq!(state.as_ref().len(), 32);
//!
//! assert!(verify_state(Some(state.as_ref()), Some(state.as_ref())).is_ok());
//! assert!(verify_state(Some(state.as_ref()), Some("forged")).is_err());
//! assert!(verify_state(None, Some(state.as_ref())).is_err());
//! ```

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;

use crate::auth::oauth::error::OAuthError;
use crate::auth::oauth::hmac::constant_time_compare;

/// Unguessable per-install nonce.
///
/// # Thread Safety
///
/// `InstallState` is `Send + Sync`, making it safe to share across threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallState {
    value: String,
}

// Verify InstallState is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<InstallState>();
};

impl InstallState {
    /// Length of generated nonces.
    pub const LENGTH: usize = 32;

    /// Creates a new state with a cryptographically secure random nonce.
    ///
    /// The nonce is a 32-character alphanumeric string drawn from the
    /// thread-local CSPRNG.
    #[must_use]
    pub fn new() -> Self {
        let value: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::LENGTH)
            .map(char::from)
            .collect();

        Self { value }
    }

    /// Wraps a state value received from a cookie or query string.
    #[must_use]
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Compares against a received value in constant time.
    #[must_use]
    pub fn matches(&self, received: &str) -> bool {
        constant_time_compare(&self.value, received)
    }
}

impl Default for InstallState {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<str> for InstallState {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Checks the echoed `state` parameter against the state cookie.
///
/// Both values must be present and non-empty, and must match exactly.
///
/// # Errors
///
/// Returns [`OAuthError::StateMismatch`] when either side is missing or the
/// values differ.
pub fn verify_state(expected: Option<&str>, received: Option<&str>) -> Result<(), OAuthError> {
    match (expected, received) {
        (Some(expected), Some(received)) if !expected.is_empty() && !received.is_empty() => {
            if InstallState::from_raw(expected).matches(received) {
                Ok(())
            } else {
                Err(OAuthError::StateMismatch)
            }
        }
        _ => Err(OAuthError::StateMismatch),
    }
}
