//! Browser session binding.
//!
//! This module provides the [`Session`] type: the server-side record that
//! binds an opaque browser cookie to a shop and its access token after a
//! successful install.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;

use crate::config::ShopDomain;

/// Number of random bytes in a session id.
const SESSION_ID_BYTES: usize = 32;

/// An authenticated browser session for one shop.
///
/// Sessions are immutable after creation and expire at an absolute instant.
/// The `Debug` implementation redacts the access token.
///
/// # Thread Safety
///
/// `Session` is `Send + Sync`, making it safe to share across threads.
///
/// # Example
///
/// ```rust
/// use shop_auth_gateway::{Session, ShopDomain};
///
/// let session = Session::new(
///     ShopDomain::new("foo.example").unwrap(),
///     "shpat_123".to_string(),
///     chrono::Duration::hours(24),
/// );
///
/// assert!(!session.expired_at(chrono::Utc::now()));
/// assert!(!format!("{session:?}").contains("shpat_123"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque identifier carried in the session cookie.
    pub id: String,

    /// The shop this session is bound to.
    pub shop: ShopDomain,

    /// The access token used for proxied calls.
    pub access_token: String,

    /// When the session was established.
    pub created_at: DateTime<Utc>,

    /// When the session stops being accepted.
    pub expires: DateTime<Utc>,
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};

impl Session {
    /// Creates a new session with a fresh random id, valid for `lifetime`.
    #[must_use]
    pub fn new(shop: ShopDomain, access_token: String, lifetime: chrono::Duration) -> Self {
        let created_at = Utc::now();
        Self {
            id: Self::generate_id(),
            shop,
            access_token,
            created_at,
            expires: created_at + lifetime,
        }
    }

    /// Generates an unguessable session id.
    ///
    /// 32 bytes from the thread-local CSPRNG, base64url-encoded without padding.
    #[must_use]
    pub fn generate_id() -> String {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the session has expired as of `now`.
    #[must_use]
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &"[REDACTED]")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires", &self.expires)
            .finish()
    }
}
