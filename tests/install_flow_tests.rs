//! Integration tests for the install handshake.
//!
//! These tests drive `/install` and `/install/callback` through the router
//! with a mock upstream platform and verify redirects, cookies, persisted
//! rows and the number of token exchanges.

mod common;

use std::time::Duration;

use common::*;
use shop_auth_gateway::auth::oauth::InstallState;
use shop_auth_gateway::store::AccessTokenRepository;
use shop_auth_gateway::{ApiSecretKey, ShopDomain};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_exchange(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/admin/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": token,
            "scope": "read_products"
        })))
        .expect(times)
        .mount(server)
        .await;
}

async fn stored_token(app: &TestApp, shop: &str) -> Option<String> {
    AccessTokenRepository::new(&app.pool)
        .find_by_shop(&ShopDomain::new(shop).unwrap())
        .await
        .unwrap()
        .map(|token| token.access_token)
}

// === /install ===

#[tokio::test]
async fn test_install_redirects_to_authorization_page_with_state_cookie() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server).await;

    let response = app.get("/install?shop=foo.example", None).await;

    assert_eq!(response.status(), 302);
    let location = location(&response);
    let state = set_cookie_value(&response, "state").expect("state cookie");
    assert_eq!(state.len(), 32);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(
        location,
        format!(
            "{}/admin/oauth/authorize?client_id={API_KEY}&scope=read_products&state={state}&redirect_uri=https%3A%2F%2Fgateway.example.com%2Finstall%2Fcallback",
            server.uri()
        )
    );

    let cookie = set_cookies(&response)
        .into_iter()
        .find(|cookie| cookie.starts_with("state="))
        .unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=600"));

    assert_eq!(app.count("access_tokens").await, 0);
    assert_eq!(app.count("sessions").await, 0);
}

#[tokio::test]
async fn test_install_issues_fresh_state_per_attempt() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server).await;

    let first = app.get("/install?shop=foo.example", None).await;
    let second = app.get("/install?shop=foo.example", None).await;

    assert_ne!(
        set_cookie_value(&first, "state"),
        set_cookie_value(&second, "state")
    );
}

#[tokio::test]
async fn test_install_without_shop_is_400() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server).await;

    let response = app.get("/install", None).await;

    assert_eq!(response.status(), 400);
    assert!(set_cookie_value(&response, "state").is_none());
    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Missing shop parameter"));
}

#[tokio::test]
async fn test_install_with_invalid_shop_is_400() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server).await;

    for shop in ["evil.example%2Fpath", "localhost", "bad_shop.example", "foo.example%3A8443"] {
        let response = app.get(&format!("/install?shop={shop}"), None).await;
        assert_eq!(response.status(), 400, "shop {shop} should be rejected");
    }
}

// === /install/callback: verification ===

#[tokio::test]
async fn test_callback_with_mismatched_state_is_403_and_writes_nothing() {
    let server = MockServer::start().await;
    mock_exchange(&server, "shpat_never", 0).await;
    let app = TestApp::new(&server).await;

    let uri = signed_callback_uri(
        &[("shop", SHOP), ("code", "abc123"), ("state", "query-state")],
        API_SECRET,
    );
    let response = app.get(&uri, Some("state=cookie-state")).await;

    assert_eq!(response.status(), 403);
    assert!(set_cookie_value(&response, "session").is_none());
    let body = json_body(response).await;
    assert_eq!(body["message"], "Request origin cannot be verified");

    assert_eq!(app.count("access_tokens").await, 0);
    assert_eq!(app.count("sessions").await, 0);
    assert_eq!(app.count("consumed_install_states").await, 0);
}

#[tokio::test]
async fn test_callback_without_state_cookie_is_403() {
    let server = MockServer::start().await;
    mock_exchange(&server, "shpat_never", 0).await;
    let app = TestApp::new(&server).await;

    let uri = signed_callback_uri(
        &[("shop", SHOP), ("code", "abc123"), ("state", "some-state")],
        API_SECRET,
    );
    let response = app.get(&uri, None).await;

    assert_eq!(response.status(), 403);
    assert_eq!(app.count("sessions").await, 0);
}

#[tokio::test]
async fn test_callback_with_tampered_parameter_is_400_and_writes_nothing() {
    let server = MockServer::start().await;
    mock_exchange(&server, "shpat_never", 0).await;
    let app = TestApp::new(&server).await;

    let state = InstallState::new();
    let uri = signed_callback_uri(
        &[("shop", SHOP), ("code", "abc123"), ("state", state.as_ref())],
        API_SECRET,
    )
    .replace("code=abc123", "code=abc124");
    let response = app.get(&uri, Some(&format!("state={state}"))).await;

    assert_eq!(response.status(), 400);
    assert_eq!(set_cookie_value(&response, "state").as_deref(), Some(""));
    let body = json_body(response).await;
    assert_eq!(body["message"], "HMAC validation failed");

    assert_eq!(app.count("access_tokens").await, 0);
    assert_eq!(app.count("sessions").await, 0);
    assert_eq!(app.count("consumed_install_states").await, 0);
}

#[tokio::test]
async fn test_callback_with_missing_parameters_is_400() {
    let server = MockServer::start().await;
    mock_exchange(&server, "shpat_never", 0).await;
    let app = TestApp::new(&server).await;

    let state = InstallState::new();
    let uri = callback_uri(&[("shop", SHOP), ("state", state.as_ref())]);
    let response = app.get(&uri, Some(&format!("state={state}"))).await;

    assert_eq!(response.status(), 400);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Required parameters missing: hmac, code");
    assert_eq!(app.count("consumed_install_states").await, 0);
}

// === /install/callback: token resolution ===

#[tokio::test]
async fn test_callback_for_new_shop_exchanges_code_once_and_binds_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth/access_token"))
        .and(body_json(serde_json::json!({
            "client_id": API_KEY,
            "client_secret": API_SECRET,
            "code": "abc123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "shpat_new",
            "scope": "read_products"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = TestApp::new(&server).await;

    let state = InstallState::new();
    let uri = signed_callback_uri(
        &[
            ("shop", SHOP),
            ("code", "abc123"),
            ("state", state.as_ref()),
            ("timestamp", "1700000000"),
        ],
        API_SECRET,
    );
    let response = app.get(&uri, Some(&format!("state={state}"))).await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/app");
    let session_id = set_cookie_value(&response, "session").expect("session cookie");
    assert_eq!(session_id.len(), 43);
    let cookie = set_cookies(&response)
        .into_iter()
        .find(|cookie| cookie.starts_with("session="))
        .unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=86400"));
    assert_eq!(set_cookie_value(&response, "state").as_deref(), Some(""));

    assert_eq!(app.count("access_tokens").await, 1);
    assert_eq!(stored_token(&app, SHOP).await.as_deref(), Some("shpat_new"));
    assert_eq!(app.count("sessions").await, 1);
}

#[tokio::test]
async fn test_callback_for_known_shop_reuses_stored_token() {
    let server = MockServer::start().await;
    mock_exchange(&server, "shpat_other", 0).await;
    let app = TestApp::new(&server).await;
    app.seed_token(SHOP, "shpat_existing").await;

    let session_id = app.install(SHOP, "abc123").await;

    assert!(!session_id.is_empty());
    assert_eq!(app.count("access_tokens").await, 1);
    assert_eq!(
        stored_token(&app, SHOP).await.as_deref(),
        Some("shpat_existing")
    );
}

#[tokio::test]
async fn test_concurrent_callbacks_for_new_shop_store_one_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "access_token": "shpat_concurrent",
                    "scope": "read_products"
                }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1..=2)
        .mount(&server)
        .await;
    let app = TestApp::new(&server).await;

    let (first, second) = tokio::join!(app.install(SHOP, "code-one"), app.install(SHOP, "code-two"));

    assert_ne!(first, second);
    assert_eq!(app.count("access_tokens").await, 1);
    assert_eq!(app.count("sessions").await, 2);
}

#[tokio::test]
async fn test_replayed_callback_is_403() {
    let server = MockServer::start().await;
    mock_exchange(&server, "shpat_new", 1).await;
    let app = TestApp::new(&server).await;

    let state = InstallState::new();
    let uri = signed_callback_uri(
        &[("shop", SHOP), ("code", "abc123"), ("state", state.as_ref())],
        API_SECRET,
    );
    let cookie = format!("state={state}");

    let first = app.get(&uri, Some(&cookie)).await;
    let replay = app.get(&uri, Some(&cookie)).await;

    assert_eq!(first.status(), 302);
    assert_eq!(replay.status(), 403);
    assert_eq!(app.count("sessions").await, 1);
}

#[tokio::test]
async fn test_failed_exchange_is_500_without_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_request",
            "error_description": "The authorization code was not found or was already used"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = TestApp::new(&server).await;

    let state = InstallState::new();
    let uri = signed_callback_uri(
        &[("shop", SHOP), ("code", "abc123"), ("state", state.as_ref())],
        API_SECRET,
    );
    let response = app.get(&uri, Some(&format!("state={state}"))).await;

    assert_eq!(response.status(), 500);
    assert!(set_cookie_value(&response, "session").is_none());
    let body = json_body(response).await;
    assert!(!body["message"].as_str().unwrap().contains("abc123"));

    assert_eq!(app.count("access_tokens").await, 0);
    assert_eq!(app.count("sessions").await, 0);
}

#[tokio::test]
async fn test_callback_signed_with_previous_secret_is_accepted() {
    let server = MockServer::start().await;
    mock_exchange(&server, "shpat_rotated", 1).await;
    let config = base_config(&server)
        .old_api_secret_key(ApiSecretKey::new("previous-secret").unwrap())
        .build()
        .unwrap();
    let app = TestApp::with_config(config).await;

    let state = InstallState::new();
    let uri = signed_callback_uri(
        &[("shop", SHOP), ("code", "abc123"), ("state", state.as_ref())],
        "previous-secret",
    );
    let response = app.get(&uri, Some(&format!("state={state}"))).await;

    assert_eq!(response.status(), 302);
    assert_eq!(
        stored_token(&app, SHOP).await.as_deref(),
        Some("shpat_rotated")
    );
}
