//! HTTP client for upstream platform calls.
//!
//! This module provides the [`HttpClient`] type used for both the token
//! exchange and the authenticated resource proxy.
//!
//! # Features
//!
//! - One shared connection pool for the whole process
//! - Connect and overall request timeouts from [`AppConfig`]
//! - Base URI construction from the shop domain or the `api_host` override
//! - `X-Shopify-Access-Token` header injection for authenticated calls
//! - User-Agent header with gateway version
//! - Error text extraction from upstream error bodies
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_auth_gateway::clients::HttpClient;
//!
//! let client = HttpClient::new(&config)?;
//! let body = client
//!     .get_json(&shop, &access_token, "/admin/products/count.json", &[])
//!     .await?;
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::clients::errors::{HttpError, HttpResponseError};
use crate::config::{upstream_base_uri, AppConfig, HostUrl, ShopDomain};

/// Gateway version for the User-Agent header.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the per-shop access token on upstream calls.
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP client for upstream calls.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    api_host: Option<HostUrl>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new client from the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the TLS backend cannot be initialized.
    pub fn new(config: &AppConfig) -> Result<Self, HttpError> {
        let user_agent = format!(
            "Shop Auth Gateway v{GATEWAY_VERSION} | Rust {}",
            option_env!("CARGO_PKG_RUST_VERSION").unwrap_or("unknown")
        );

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(user_agent)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_host: config.api_host().cloned(),
        })
    }

    /// Returns the base URI for requests on behalf of `shop`.
    #[must_use]
    pub fn base_uri(&self, shop: &ShopDomain) -> String {
        upstream_base_uri(self.api_host.as_ref(), shop)
    }

    /// Sends an authenticated GET and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// - [`HttpError::Network`]: transport failure or timeout
    /// - [`HttpError::Response`]: non-2xx status
    /// - [`HttpError::InvalidBody`]: 2xx response that is not JSON
    pub async fn get_json(
        &self,
        shop: &ShopDomain,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, HttpError> {
        let url = format!("{}{}", self.base_uri(shop), path);
        tracing::debug!(shop = %shop, path, "Sending upstream GET");

        let response = self
            .client
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        Self::read_json(response).await
    }

    /// Sends an unauthenticated JSON POST and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get_json`].
    pub async fn post_json<B: Serialize + Sync>(
        &self,
        shop: &ShopDomain,
        path: &str,
        body: &B,
    ) -> Result<Value, HttpError> {
        let url = format!("{}{}", self.base_uri(shop), path);
        tracing::debug!(shop = %shop, path, "Sending upstream POST");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, HttpError> {
        let code = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body_text = response.text().await?;

        if !(200..300).contains(&code) {
            let message = Self::serialize_error(code, &body_text);
            tracing::warn!(
                status = code,
                request_id = request_id.as_deref().unwrap_or("-"),
                "Upstream returned an error response"
            );
            return Err(HttpError::Response(HttpResponseError {
                code,
                message,
                error_reference: request_id,
            }));
        }

        serde_json::from_str(&body_text).map_err(|e| HttpError::InvalidBody {
            reason: e.to_string(),
        })
    }

    /// Extracts a human-readable error from an upstream error body.
    ///
    /// Looks at `errors`, then `error` (with `error_description`), then falls
    /// back to the raw body or the status code.
    fn serialize_error(code: u16, body_text: &str) -> String {
        let as_text = |value: &Value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        if let Ok(body) = serde_json::from_str::<Value>(body_text) {
            if let Some(errors) = body.get("errors") {
                return as_text(errors);
            }
            if let Some(error) = body.get("error") {
                return match body.get("error_description") {
                    Some(desc) => format!("{}: {}", as_text(error), as_text(desc)),
                    None => as_text(error),
                };
            }
        }

        let trimmed = body_text.trim();
        if trimmed.is_empty() {
            format!("Upstream responded with status {code}")
        } else {
            trimmed.to_string()
        }
    }
}
