//! HMAC validation for install callbacks.
//!
//! This module provides functions for computing and validating the
//! HMAC-SHA256 signatures the platform attaches to install callbacks.
//!
//! # Security
//!
//! All HMAC comparisons use constant-time comparison to prevent timing attacks.
//! The module also supports key rotation by falling back to an old secret key
//! if validation with the primary key fails.
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::auth::oauth::hmac::compute_signature;
//!
//! let message = "code=abc123&shop=foo.example&state=xyz";
//! let signature = compute_signature(message, "my-api-secret");
//! assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::auth::oauth::CallbackQuery;
use crate::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

/// Computes an HMAC-SHA256 signature for the given message.
///
/// The signature is returned as a lowercase hexadecimal string, which is the
/// format the platform sends in the `hmac` parameter.
///
/// # Note
///
/// This function uses `expect()` internally but this will never panic because
/// HMAC-SHA256 accepts keys of any length.
///
/// # Example
///
/// ```rust
/// use shop_auth_gateway::auth::oauth::hmac::compute_signature;
///
/// let sig = compute_signature("test-message", "secret-key");
/// assert_eq!(sig.len(), 64); // SHA256 produces 32 bytes = 64 hex chars
/// ```
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature(message: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Performs constant-time comparison of two strings.
///
/// Used for signature verification and install state comparison.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    // ConstantTimeEq handles different lengths securely
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Validates the HMAC signature of an install callback.
///
/// A missing `hmac` parameter never validates. The received signature is
/// lower-cased before comparison, so upper-case hex from a proxy that
/// rewrote the query still matches.
///
/// # Key Rotation Support
///
/// If the primary `api_secret_key` fails validation, the function will
/// try `old_api_secret_key` if configured.
#[must_use]
pub fn validate_hmac(query: &CallbackQuery, config: &AppConfig) -> bool {
    let Some(received) = query.hmac() else {
        return false;
    };
    let received = received.to_ascii_lowercase();
    let signable = query.to_signable_string();

    let computed = compute_signature(&signable, config.api_secret_key().as_ref());
    if constant_time_compare(&computed, &received) {
        return true;
    }

    if let Some(old_secret) = config.old_api_secret_key() {
        let computed_old = compute_signature(&signable, old_secret.as_ref());
        if constant_time_compare(&computed_old, &received) {
            return true;
        }
    }

    false
}
