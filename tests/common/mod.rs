//! Shared fixtures for router-level tests.
//!
//! Every test gets its own in-memory database and a wiremock server standing
//! in for the storefront platform.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use shop_auth_gateway::auth::oauth::{compute_signature, CallbackQuery, InstallState};
use shop_auth_gateway::store::{self, AccessTokenRepository};
use shop_auth_gateway::{router, ApiKey, ApiSecretKey, AppConfig, AppState, HostUrl, ShopDomain};
use sqlx::SqlitePool;
use tower::ServiceExt;
use wiremock::MockServer;

pub const API_KEY: &str = "test-api-key";
pub const API_SECRET: &str = "test-api-secret";
pub const FORWARDING_ADDRESS: &str = "https://gateway.example.com";
pub const SHOP: &str = "foo.example";

/// Test harness wrapping the router and its database.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub config: AppConfig,
}

impl TestApp {
    /// Builds an app whose upstream calls all go to `server`.
    pub async fn new(server: &MockServer) -> Self {
        Self::with_config(base_config(server).build().unwrap()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        // A single connection keeps every query on the same in-memory database.
        let pool = store::create_pool("sqlite::memory:", 1).await.unwrap();
        store::migrate(&pool).await.unwrap();
        let state = AppState::new(config.clone(), pool.clone()).unwrap();
        Self {
            router: router(state),
            pool,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Stores a credential for `shop` directly.
    pub async fn seed_token(&self, shop: &str, token: &str) {
        AccessTokenRepository::new(&self.pool)
            .save(
                &ShopDomain::new(shop).unwrap(),
                token,
                "read_products",
                chrono::Utc::now(),
            )
            .await
            .unwrap();
    }

    /// Runs a signed callback for `shop` and returns the session cookie value.
    pub async fn install(&self, shop: &str, code: &str) -> String {
        let state = InstallState::new();
        let state = state.as_ref();
        let uri = signed_callback_uri(&[("shop", shop), ("code", code), ("state", state)], API_SECRET);
        let response = self.get(&uri, Some(&format!("state={state}"))).await;
        assert_eq!(response.status(), 302, "install for {shop} did not complete");
        set_cookie_value(&response, "session").expect("session cookie set")
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub fn base_config(server: &MockServer) -> shop_auth_gateway::AppConfigBuilder {
    AppConfig::builder()
        .api_key(ApiKey::new(API_KEY).unwrap())
        .api_secret_key(ApiSecretKey::new(API_SECRET).unwrap())
        .host(HostUrl::new(FORWARDING_ADDRESS).unwrap())
        .api_host(HostUrl::new(server.uri()).unwrap())
}

/// Builds a callback URI with a valid `hmac` over `params`.
pub fn signed_callback_uri(params: &[(&str, &str)], secret: &str) -> String {
    let query = CallbackQuery::new(
        params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    );
    let hmac = compute_signature(&query.to_signable_string(), secret);
    format!("{}&hmac={hmac}", callback_uri(params))
}

/// Builds an unsigned callback URI.
pub fn callback_uri(params: &[(&str, &str)]) -> String {
    let encoded: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("/install/callback?{}", encoded.join("&"))
}

/// All `Set-Cookie` headers of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect()
}

/// Value of the cookie `name` set by a response, if any.
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(response).into_iter().find_map(|cookie| {
        cookie
            .strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    })
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
