//! HTTP surface tests: the axum router driven in-process with `oneshot`

#![cfg(feature = "server")]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vapeshop_backend::api::{router, AppState};
use vapeshop_backend::config::{Config, LineConfig, Secret, SlipProviderConfig};
use vapeshop_backend::error::{AppError, AppResult};
use vapeshop_backend::oauth::LineLoginClient;
use vapeshop_backend::slip::providers::SlipOkProvider;
use vapeshop_backend::slip::types::{BankAccount, SlipVerificationSettings};
use vapeshop_backend::slip::{SlipSettingsProvider, SlipVerificationService};

struct FixedSettings(Option<SlipVerificationSettings>);

#[async_trait::async_trait]
impl SlipSettingsProvider for FixedSettings {
    async fn load_slip_settings(&self) -> AppResult<Option<SlipVerificationSettings>> {
        Ok(self.0.clone())
    }
}

struct UnreachableSettings;

#[async_trait::async_trait]
impl SlipSettingsProvider for UnreachableSettings {
    async fn load_slip_settings(&self) -> AppResult<Option<SlipVerificationSettings>> {
        Err(AppError::internal("Settings store returned HTTP 503"))
    }
}

fn base_config() -> Config {
    Config::from_lookup(|key| match key {
        "PORT" => Some("8080".to_string()),
        _ => None,
    })
    .unwrap()
}

fn shop_settings(is_active: bool) -> SlipVerificationSettings {
    SlipVerificationSettings {
        provider: "slipok".to_string(),
        branch_id: Secret::new("30000"),
        api_key: Secret::new("SLIPOKKEY"),
        minimum_topup_amount: 100.0,
        bank_accounts: vec![BankAccount {
            account_name: "Shop Co".to_string(),
            account_no: "123-4-55366-7".to_string(),
            bank_code: "014".to_string(),
        }],
        is_active,
    }
}

fn app(
    slip_base_url: &str,
    settings: Option<SlipVerificationSettings>,
    line: Option<LineLoginClient>,
) -> Router {
    let verifier = SlipOkProvider::new(SlipProviderConfig {
        base_url: slip_base_url.to_string(),
        timeout_secs: 5,
    })
    .unwrap();
    let slip = SlipVerificationService::new(Arc::new(FixedSettings(settings)), Arc::new(verifier));
    router(AppState::new(base_config(), slip, line))
}

fn slip_data(amount: f64) -> Value {
    json!({
        "sender": { "displayName": "นาย ก", "name": "Mr. Kor",
                    "account": { "type": "BANKAC", "value": "xxx-x-x1234-x" } },
        "receiver": { "displayName": "ร้านค้า", "name": "Shop Co",
                      "account": { "type": "BANKAC", "value": "xxx-x-x5366-x" } },
        "sendingBank": "004",
        "receivingBank": "014",
        "transRef": "015073144041ATF00999",
        "transDate": "20240314",
        "transTime": "14:40:41",
        "amount": amount,
        "ref1": null, "ref2": null, "ref3": null
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let (status, body) = send(app("http://127.0.0.1:1", None, None), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["slip_verification_configured"], false);
    assert_eq!(body["line_login_configured"], false);
}

#[tokio::test]
async fn test_health_reports_unknown_when_settings_store_fails() {
    let verifier = SlipOkProvider::new(SlipProviderConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 5,
    })
    .unwrap();
    let slip = SlipVerificationService::new(Arc::new(UnreachableSettings), Arc::new(verifier));
    let app = router(AppState::new(base_config(), slip, None));

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slip_verification_configured"], Value::Null);
}

#[tokio::test]
async fn test_bank_lookup() {
    let (status, body) = send(app("http://127.0.0.1:1", None, None), get("/api/banks/004")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "ธนาคารกสิกรไทย (KBANK)");
    assert_eq!(body["registered"], true);

    let (_, body) = send(app("http://127.0.0.1:1", None, None), get("/api/banks/999")).await;
    assert_eq!(body["name"], "999");
    assert_eq!(body["registered"], false);

    let (_, body) = send(app("http://127.0.0.1:1", None, None), get("/api/banks")).await;
    assert!(body.as_array().unwrap().len() > 10);
}

#[tokio::test]
async fn test_verify_requires_payload() {
    let app = app("http://127.0.0.1:1", Some(shop_settings(true)), None);
    let (status, body) = send(app, post_json("/api/slip/verify", json!({ "amount": 150 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "payload is required");
}

#[tokio::test]
async fn test_verify_rejects_malformed_body() {
    let app = app("http://127.0.0.1:1", Some(shop_settings(true)), None);
    let request = Request::builder()
        .method("POST")
        .uri("/api/slip/verify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid body"));
}

#[tokio::test]
async fn test_verify_without_settings_is_server_error() {
    let app = app("http://127.0.0.1:1", None, None);
    let (status, body) = send(app, post_json("/api/slip/verify", json!({ "payload": "qr" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn test_verify_when_disabled_is_unavailable() {
    let app = app("http://127.0.0.1:1", Some(shop_settings(false)), None);
    let (status, _) = send(app, post_json("/api/slip/verify", json!({ "payload": "qr" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_verify_below_minimum_is_bad_request() {
    let app = app("http://127.0.0.1:1", Some(shop_settings(true)), None);
    let (status, body) = send(
        app,
        post_json("/api/slip/verify", json!({ "payload": "qr", "amount": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("minimum"));
}

#[tokio::test]
async fn test_verify_accepts_valid_slip() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/line/apikey/30000");
            then.status(200)
                .json_body(json!({ "success": true, "data": slip_data(150.0) }));
        })
        .await;

    let app = app(&server.base_url(), Some(shop_settings(true)), None);
    let (status, body) = send(
        app,
        post_json("/api/slip/verify", json!({ "payload": "qr", "amount": 150 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["decision"]["status"], "accepted");
    assert_eq!(body["result"]["success"], true);
    assert_eq!(body["result"]["data"], slip_data(150.0));
    assert!(!body.to_string().contains("SLIPOKKEY"));
}

#[tokio::test]
async fn test_verify_reflects_provider_status_and_keeps_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/line/apikey/30000");
            then.status(400).json_body(json!({
                "success": false,
                "code": 1013,
                "message": "The amount sent is not equal to the amount on the slip",
                "data": slip_data(149.0)
            }));
        })
        .await;

    let app = app(&server.base_url(), Some(shop_settings(true)), None);
    let (status, body) = send(
        app,
        post_json("/api/slip/verify", json!({ "payload": "qr", "amount": 150 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["accepted"], false);
    assert_eq!(body["result"]["code"], 1013);
    assert_eq!(body["result"]["data"]["amount"], 149.0);
    assert!(body["error"].as_str().unwrap().contains("1013"));
    assert_eq!(body["decision"]["status"], "rejected");
    assert_eq!(body["decision"]["code"], 1013);
    assert_eq!(body["decision"]["data"], slip_data(149.0));
}

#[tokio::test]
async fn test_line_login_not_configured() {
    let (status, body) = send(
        app("http://127.0.0.1:1", None, None),
        get("/api/auth/line/login"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("LINE login is not configured"));
}

fn line_client(base_url: &str) -> LineLoginClient {
    LineLoginClient::new(LineConfig {
        channel_id: "1650000000".to_string(),
        channel_secret: Secret::new("channel-secret"),
        redirect_uri: "https://shop.example/api/auth/line/callback/".to_string(),
        api_base_url: base_url.to_string(),
        auth_base_url: base_url.to_string(),
        timeout_secs: 5,
        max_retries: 0,
    })
    .unwrap()
}

#[tokio::test]
async fn test_line_login_redirects() {
    let app = app(
        "http://127.0.0.1:1",
        None,
        Some(line_client("https://access.line.me")),
    );
    let response = app.oneshot(get("/api/auth/line/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://access.line.me/oauth2/v2.1/authorize?"));
    assert!(location.contains("client_id=1650000000"));
    assert!(!location.contains("channel-secret"));
}

#[tokio::test]
async fn test_line_callback_requires_code() {
    let app = app(
        "http://127.0.0.1:1",
        None,
        Some(line_client("https://api.line.me")),
    );
    let (status, body) = send(app, get("/api/auth/line/callback")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "code is required");
}

#[tokio::test]
async fn test_line_callback_returns_profile() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth2/v2.1/token");
            then.status(200).json_body(json!({
                "access_token": "access-abc",
                "refresh_token": "refresh-def",
                "expires_in": 2592000
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/profile");
            then.status(200).json_body(json!({
                "userId": "U1",
                "displayName": "Cony",
                "pictureUrl": "https://profile.line-scdn.net/cony"
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/oauth2/v2.1/userinfo");
            then.status(500);
        })
        .await;

    let app = app("http://127.0.0.1:1", None, Some(line_client(&server.base_url())));
    let (status, body) = send(app, get("/api/auth/line/callback?code=auth-code&state=s")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["userId"], "U1");
    assert_eq!(body["profile"]["email"], Value::Null);
    assert_eq!(body["expiresIn"], 2592000);
    let expires_at = chrono::DateTime::parse_from_rfc3339(body["expiresAt"].as_str().unwrap())
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert!(expires_at > chrono::Utc::now() + chrono::Duration::days(29));
    assert!(!body.to_string().contains("access-abc"));
}
