//! Install callback validation and session establishment.
//!
//! This module provides the [`validate_auth_callback`] function, which runs
//! the full callback pipeline for `GET /install/callback`.
//!
//! # Overview
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. The echoed `state` must match the state cookie
//! 2. `shop`, `hmac` and `code` must be present and `shop` must be a valid domain
//! 3. The HMAC signature must verify against the app secret
//! 4. The state is consumed so it cannot complete a second callback
//! 5. The shop's stored token is reused, or the code is exchanged and the
//!    new token is stored
//! 6. A session is created and persisted for the browser
//!
//! Steps 1 to 3 never touch the store or the network.
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_auth_gateway::auth::oauth::{validate_auth_callback, CallbackContext, CallbackQuery};
//!
//! let ctx = CallbackContext::new(&config, &http_client, &pool);
//! let session = validate_auth_callback(&ctx, &query, cookie_state.as_deref()).await?;
//! // set the session cookie and redirect to the app
//! ```

use chrono::Utc;
use sqlx::SqlitePool;

use crate::auth::oauth::error::OAuthError;
use crate::auth::oauth::hmac::validate_hmac;
use crate::auth::oauth::state::verify_state;
use crate::auth::oauth::token_exchange::exchange_code;
use crate::auth::oauth::CallbackQuery;
use crate::auth::Session;
use crate::clients::HttpClient;
use crate::config::{AppConfig, ShopDomain};
use crate::store::{AccessTokenRepository, InstallStateRepository, SessionRepository};

/// Everything the callback pipeline needs besides the request itself.
#[derive(Clone, Copy)]
pub struct CallbackContext<'a> {
    config: &'a AppConfig,
    client: &'a HttpClient,
    pool: &'a SqlitePool,
}

impl<'a> CallbackContext<'a> {
    /// Bundles configuration, the upstream client and the database pool.
    #[must_use]
    pub const fn new(config: &'a AppConfig, client: &'a HttpClient, pool: &'a SqlitePool) -> Self {
        Self {
            config,
            client,
            pool,
        }
    }
}

/// Validates an install callback and binds a new session.
///
/// # Arguments
///
/// * `ctx` - Configuration, upstream client and pool
/// * `query` - The callback query parameters
/// * `expected_state` - The state cookie value, if the browser sent one
///
/// # Errors
///
/// - [`OAuthError::StateMismatch`]: state cookie missing or not equal to the parameter
/// - [`OAuthError::MissingParameters`]: `shop`, `hmac` or `code` absent
/// - [`OAuthError::InvalidCallback`]: `shop` is not a valid domain
/// - [`OAuthError::InvalidHmac`]: signature does not verify
/// - [`OAuthError::StateReused`]: the state already completed a callback
/// - [`OAuthError::TokenExchangeFailed`]: the code could not be exchanged
/// - [`OAuthError::Store`]: persistence failed or the credential store is inconsistent
#[tracing::instrument(skip_all, fields(shop = query.shop().unwrap_or("")))]
pub async fn validate_auth_callback(
    ctx: &CallbackContext<'_>,
    query: &CallbackQuery,
    expected_state: Option<&str>,
) -> Result<Session, OAuthError> {
    // Step 1: CSRF check
    if let Err(e) = verify_state(expected_state, query.state()) {
        tracing::warn!("Rejected install callback: state mismatch");
        return Err(e);
    }

    // Step 2: required parameters
    let (shop, code) = required_params(query)?;

    // Step 3: signature
    if !validate_hmac(query, ctx.config) {
        tracing::warn!("Rejected install callback: HMAC validation failed");
        return Err(OAuthError::InvalidHmac);
    }

    // Step 4: single use
    let state = query.state().unwrap_or_default();
    if !InstallStateRepository::new(ctx.pool)
        .consume(state, Utc::now())
        .await?
    {
        tracing::warn!("Rejected install callback: state already used");
        return Err(OAuthError::StateReused);
    }

    // Step 5: token resolution
    let access_token = resolve_access_token(ctx, &shop, code).await?;

    // Step 6: session binding
    let session = Session::new(shop, access_token, ctx.config.session_lifetime());
    SessionRepository::new(ctx.pool).create(&session).await?;

    tracing::info!(shop = %session.shop, "Install completed, session bound");
    Ok(session)
}

/// Extracts and validates `shop` and `code`, and checks `hmac` is present.
fn required_params(query: &CallbackQuery) -> Result<(ShopDomain, &str), OAuthError> {
    let missing: Vec<&'static str> = [
        ("shop", query.shop()),
        ("hmac", query.hmac()),
        ("code", query.code()),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none())
    .map(|(name, _)| name)
    .collect();

    let (Some(shop), Some(code)) = (query.shop(), query.code()) else {
        return Err(OAuthError::MissingParameters { missing });
    };
    if !missing.is_empty() {
        return Err(OAuthError::MissingParameters { missing });
    }

    let shop = ShopDomain::new(shop).map_err(|_| OAuthError::InvalidCallback {
        reason: format!("Invalid shop domain: {shop}"),
    })?;

    Ok((shop, code))
}

/// Returns the stored token for `shop`, exchanging `code` only when none exists.
async fn resolve_access_token(
    ctx: &CallbackContext<'_>,
    shop: &ShopDomain,
    code: &str,
) -> Result<String, OAuthError> {
    let tokens = AccessTokenRepository::new(ctx.pool);

    if let Some(existing) = tokens.find_by_shop(shop).await? {
        tracing::debug!("Reusing stored access token");
        return Ok(existing.access_token);
    }

    let response = exchange_code(ctx.client, ctx.config, shop, code).await?;
    tokens
        .save(
            shop,
            &response.access_token,
            response.scope.as_deref().unwrap_or_default(),
            Utc::now(),
        )
        .await?;

    Ok(response.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth::hmac::compute_signature;
    use crate::config::{ApiKey, ApiSecretKey, HostUrl};
    use crate::store::test_pool;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(server: &MockServer) -> AppConfig {
        AppConfig::builder()
            .api_key(ApiKey::new("test-api-key").unwrap())
            .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
            .host(HostUrl::new("https://myapp.example.com").unwrap())
            .api_host(HostUrl::new(server.uri()).unwrap())
            .build()
            .unwrap()
    }

    fn signed_query(pairs: &[(&str, &str)], secret: &str) -> CallbackQuery {
        let mut params: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let signable = CallbackQuery::new(params.clone()).to_signable_string();
        params.push(("hmac".to_string(), compute_signature(&signable, secret)));
        CallbackQuery::new(params)
    }

    fn valid_query() -> CallbackQuery {
        signed_query(
            &[
                ("code", "auth-code-123"),
                ("shop", "foo.example"),
                ("state", "test-state"),
                ("timestamp", "1700000000"),
            ],
            "test-secret",
        )
    }

    async fn mount_exchange(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .and(body_json(serde_json::json!({
                "client_id": "test-api-key",
                "client_secret": "test-secret",
                "code": "auth-code-123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "shpat_new",
                "scope": "read_products"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_rejects_state_mismatch_before_anything_else() {
        let server = MockServer::start().await;
        mount_exchange(&server, 0).await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        // Unsigned and missing code: the state check still wins.
        let query = CallbackQuery::new(vec![("state".to_string(), "test-state".to_string())]);
        let result = validate_auth_callback(&ctx, &query, Some("other-state")).await;
        assert!(matches!(result, Err(OAuthError::StateMismatch)));

        let result = validate_auth_callback(&ctx, &valid_query(), None).await;
        assert!(matches!(result, Err(OAuthError::StateMismatch)));
    }

    #[tokio::test]
    async fn test_reports_missing_parameters_before_signature() {
        let server = MockServer::start().await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        let query = CallbackQuery::new(vec![
            ("state".to_string(), "test-state".to_string()),
            ("shop".to_string(), "foo.example".to_string()),
        ]);
        let result = validate_auth_callback(&ctx, &query, Some("test-state")).await;

        match result {
            Err(OAuthError::MissingParameters { missing }) => {
                assert_eq!(missing, vec!["hmac", "code"]);
            }
            other => panic!("Expected MissingParameters, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_shop_domain() {
        let server = MockServer::start().await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        let query = signed_query(
            &[
                ("code", "auth-code-123"),
                ("shop", "evil.example/admin"),
                ("state", "test-state"),
            ],
            "test-secret",
        );
        let result = validate_auth_callback(&ctx, &query, Some("test-state")).await;

        assert!(matches!(result, Err(OAuthError::InvalidCallback { .. })));
    }

    #[tokio::test]
    async fn test_rejects_bad_hmac_without_side_effects() {
        let server = MockServer::start().await;
        mount_exchange(&server, 0).await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        let query = signed_query(
            &[
                ("code", "auth-code-123"),
                ("shop", "foo.example"),
                ("state", "test-state"),
            ],
            "wrong-secret",
        );
        let result = validate_auth_callback(&ctx, &query, Some("test-state")).await;
        assert!(matches!(result, Err(OAuthError::InvalidHmac)));

        let consumed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consumed_install_states")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(consumed, 0);
    }

    #[tokio::test]
    async fn test_exchanges_code_and_binds_session() {
        let server = MockServer::start().await;
        mount_exchange(&server, 1).await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        let session = validate_auth_callback(&ctx, &valid_query(), Some("test-state"))
            .await
            .unwrap();

        assert_eq!(session.shop.as_ref(), "foo.example");
        assert_eq!(session.access_token, "shpat_new");

        let stored = AccessTokenRepository::new(&pool)
            .find_by_shop(&session.shop)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token, "shpat_new");
        assert_eq!(stored.scope, "read_products");

        let bound = SessionRepository::new(&pool)
            .find_active(&session.id, Utc::now())
            .await
            .unwrap();
        assert!(bound.is_some());
    }

    #[tokio::test]
    async fn test_reuses_stored_token_without_exchange() {
        let server = MockServer::start().await;
        mount_exchange(&server, 0).await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        AccessTokenRepository::new(&pool)
            .save(
                &ShopDomain::new("foo.example").unwrap(),
                "shpat_existing",
                "read_products",
                Utc::now(),
            )
            .await
            .unwrap();

        let session = validate_auth_callback(&ctx, &valid_query(), Some("test-state"))
            .await
            .unwrap();
        assert_eq!(session.access_token, "shpat_existing");
    }

    #[tokio::test]
    async fn test_rejects_replayed_state() {
        let server = MockServer::start().await;
        mount_exchange(&server, 1).await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        validate_auth_callback(&ctx, &valid_query(), Some("test-state"))
            .await
            .unwrap();
        let replay = validate_auth_callback(&ctx, &valid_query(), Some("test-state")).await;

        assert!(matches!(replay, Err(OAuthError::StateReused)));
    }

    #[tokio::test]
    async fn test_exchange_failure_stores_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/oauth/access_token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let config = create_test_config(&server);
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        let result = validate_auth_callback(&ctx, &valid_query(), Some("test-state")).await;
        assert!(matches!(
            result,
            Err(OAuthError::TokenExchangeFailed { status: 500, .. })
        ));

        let tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM access_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(tokens, 0);
        assert_eq!(sessions, 0);
    }

    #[tokio::test]
    async fn test_accepts_signature_from_old_secret() {
        let server = MockServer::start().await;
        mount_exchange(&server, 1).await;
        let config = AppConfig::builder()
            .api_key(ApiKey::new("test-api-key").unwrap())
            .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
            .old_api_secret_key(ApiSecretKey::new("old-secret").unwrap())
            .host(HostUrl::new("https://myapp.example.com").unwrap())
            .api_host(HostUrl::new(server.uri()).unwrap())
            .build()
            .unwrap();
        let client = HttpClient::new(&config).unwrap();
        let pool = test_pool().await;
        let ctx = CallbackContext::new(&config, &client, &pool);

        let query = signed_query(
            &[
                ("code", "auth-code-123"),
                ("shop", "foo.example"),
                ("state", "test-state"),
            ],
            "old-secret",
        );
        let session = validate_auth_callback(&ctx, &query, Some("test-state")).await;
        assert!(session.is_ok());
    }
}
