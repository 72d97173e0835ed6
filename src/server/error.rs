//! HTTP boundary error type.
//!
//! Every handler returns [`AppError`]; its `IntoResponse` implementation is
//! the only place errors become status codes. Bodies are JSON objects of the
//! form `{"message": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::auth::oauth::OAuthError;
use crate::clients::{HttpError, PageRequestError};
use crate::store::RepositoryError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request input.
    #[error("{0}")]
    ClientInput(String),

    /// The install state could not be verified or was already used.
    #[error("Request origin cannot be verified")]
    Csrf,

    /// The callback signature did not verify.
    #[error("HMAC validation failed")]
    Signature,

    /// Exchanging the authorization code failed.
    #[error("Token exchange failed: {0}")]
    UpstreamExchange(String),

    /// Persistence failed or stored data is inconsistent.
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),

    /// No live session is bound to the request.
    #[error("Session Error")]
    SessionMissing,

    /// A proxied upstream call failed.
    #[error("Upstream error: {0}")]
    UpstreamProxy(#[from] HttpError),
}

impl AppError {
    /// The status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ClientInput(_) | Self::Signature | Self::SessionMissing => StatusCode::BAD_REQUEST,
            Self::Csrf => StatusCode::FORBIDDEN,
            Self::UpstreamExchange(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamProxy(error) => error
                .status()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::ClientInput(message) => message.clone(),
            Self::UpstreamExchange(_) => "Failed to obtain access token".to_string(),
            Self::Store(_) => "Internal server error".to_string(),
            Self::UpstreamProxy(HttpError::Response(response)) => response.message.clone(),
            Self::UpstreamProxy(error) if error.is_timeout() => "Upstream request timed out".to_string(),
            Self::UpstreamProxy(_) => "Upstream request failed".to_string(),
            Self::Csrf | Self::Signature | Self::SessionMissing => self.to_string(),
        }
    }
}

impl From<OAuthError> for AppError {
    fn from(error: OAuthError) -> Self {
        match error {
            OAuthError::StateMismatch | OAuthError::StateReused => Self::Csrf,
            OAuthError::MissingParameters { .. } => Self::ClientInput(error.to_string()),
            OAuthError::InvalidCallback { reason } => Self::ClientInput(reason),
            OAuthError::InvalidHmac => Self::Signature,
            OAuthError::TokenExchangeFailed { .. } => Self::UpstreamExchange(error.to_string()),
            OAuthError::Store(error) => Self::Store(error),
        }
    }
}

impl From<PageRequestError> for AppError {
    fn from(error: PageRequestError) -> Self {
        Self::ClientInput(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = serde_json::json!({ "message": self.public_message() });
        (status, Json(body)).into_response()
    }
}
