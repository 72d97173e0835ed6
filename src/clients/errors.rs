//! HTTP-specific error types for upstream calls.
//!
//! # Error Handling
//!
//! - [`HttpResponseError`]: Non-2xx HTTP responses from the upstream platform
//! - [`HttpError`]: Unified error type encompassing all upstream failures
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_auth_gateway::clients::HttpError;
//!
//! match proxy.fetch_count().await {
//!     Ok(body) => println!("Count: {}", body),
//!     Err(HttpError::Response(e)) => println!("Upstream error {}: {}", e.code, e.message),
//!     Err(HttpError::InvalidBody { reason }) => println!("Unexpected payload: {}", reason),
//!     Err(HttpError::Network(e)) => println!("Network error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Error returned when an upstream request receives a non-successful response.
///
/// # Example
///
/// ```rust
/// use shop_auth_gateway::clients::HttpResponseError;
///
/// let error = HttpResponseError {
///     code: 404,
///     message: "Not Found".to_string(),
///     error_reference: Some("abc-123".to_string()),
/// };
///
/// assert_eq!(error.to_string(), "Not Found");
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Error text extracted from the response body.
    pub message: String,
    /// Reference ID for error reporting (from X-Request-Id header).
    pub error_reference: Option<String>,
}

/// Unified error type for all upstream HTTP errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// An HTTP response error (non-2xx status code).
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// A 2xx response whose body is not the expected JSON shape.
    #[error("Invalid upstream response body: {reason}")]
    InvalidBody {
        /// What was wrong with the body.
        reason: String,
    },

    /// Network, TLS or timeout error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl HttpError {
    /// Returns `true` if the request timed out before a response arrived.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }

    /// Returns the upstream status code, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.code),
            Self::InvalidBody { .. } | Self::Network(_) => None,
        }
    }
}

// Verify HttpError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpError>();
};
