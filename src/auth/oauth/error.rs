//! Install-flow error types.
//!
//! This module contains error types for the install handshake: state
//! verification, parameter validation, signature verification, token
//! exchange and credential persistence.
//!
//! # Error Types
//!
//! - [`OAuthError::StateMismatch`]: Install state cookie and parameter disagree
//! - [`OAuthError::StateReused`]: Install state was already consumed
//! - [`OAuthError::MissingParameters`]: Required callback parameters are absent
//! - [`OAuthError::InvalidCallback`]: Callback parameters are malformed
//! - [`OAuthError::InvalidHmac`]: HMAC signature validation failed
//! - [`OAuthError::TokenExchangeFailed`]: Token exchange request failed
//! - [`OAuthError::Store`]: Credential or session persistence failed
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::auth::oauth::OAuthError;
//!
//! let error = OAuthError::InvalidHmac;
//! assert_eq!(error.to_string(), "HMAC signature validation failed");
//!
//! let error = OAuthError::MissingParameters { missing: vec!["code"] };
//! assert!(error.to_string().contains("code"));
//! ```

use crate::store::RepositoryError;
use thiserror::Error;

/// Errors that can occur while processing an install.
///
/// # Thread Safety
///
/// `OAuthError` is `Send + Sync`, making it safe to use across async boundaries.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Install state mismatch.
    ///
    /// The state cookie is missing, or the `state` parameter in the callback
    /// does not match it. Neither value is included in the message.
    #[error("Install state missing or mismatched")]
    StateMismatch,

    /// The install state already completed a callback.
    #[error("Install state has already been used")]
    StateReused,

    /// One or more required callback parameters are absent or blank.
    #[error("Required parameters missing: {}", missing.join(", "))]
    MissingParameters {
        /// Names of the missing parameters.
        missing: Vec<&'static str>,
    },

    /// Callback parameters are invalid or malformed.
    #[error("Invalid callback: {reason}")]
    InvalidCallback {
        /// Description of what's invalid about the callback.
        reason: String,
    },

    /// HMAC signature validation failed.
    ///
    /// The callback's HMAC signature does not match the expected value
    /// computed with the API secret key. This could indicate a tampered
    /// request or misconfigured secret key.
    #[error("HMAC signature validation failed")]
    InvalidHmac,

    /// Token exchange request failed.
    ///
    /// Covers transport failures (status `0`), non-success statuses and
    /// responses that do not carry an access token.
    #[error("Token exchange failed with status {status}: {message}")]
    TokenExchangeFailed {
        /// The HTTP status code returned, or `0` when no response arrived.
        status: u16,
        /// The error message from the response.
        message: String,
    },

    /// Credential or session persistence failed.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

// Verify OAuthError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthError>();
};
