//! Shared helpers for router integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Method, Request, Response, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use decision_debt_studio::server::{AppConfig, AppState, router};

pub const SESSION_PASSWORD: &str = "test-session-password-0123456789abcdef";
pub const COOKIE_NAME: &str = "decision-debt-studio-session";
pub const ACCESS_TOKEN: &str = "00Dxx0000000001!AQ4AQtest";

/// Configuration with only the session secret plus `extra`.
pub fn config(extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = extra
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    vars.insert("SESSION_PASSWORD".into(), SESSION_PASSWORD.into());
    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

/// Configuration with a full Salesforce connected app pointing at `server`.
pub fn salesforce_config(server: &MockServer, extra: &[(&str, &str)]) -> AppConfig {
    let uri = server.uri();
    let mut vars = vec![
        ("SF_LOGIN_URL", uri.as_str()),
        ("SF_CLIENT_ID", "test-consumer-key"),
        ("SF_CLIENT_SECRET", "test-consumer-secret"),
        (
            "SF_REDIRECT_URI",
            "http://localhost:3000/api/auth/callback/salesforce",
        ),
    ];
    vars.extend_from_slice(extra);
    config(&vars)
}

pub fn app(config: AppConfig) -> Router {
    router(AppState::new(config).expect("state"))
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` of the session cookie set by `response`, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie_header(response).map(|header| header.split(';').next().unwrap().to_string())
}

/// Full `Set-Cookie` header for the session cookie.
pub fn set_cookie_header(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{COOKIE_NAME}=")))
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Mount a successful token endpoint whose `instance_url` is `server` itself.
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "refresh_token": "5Aep861test",
            "instance_url": server.uri(),
            "id": "https://login.salesforce.com/id/00Dxx/005xx",
            "token_type": "Bearer",
            "issued_at": "1760788800000",
        })))
        .mount(server)
        .await;
}

/// Walk login and callback against `server`, returning the logged-in cookie.
pub async fn log_in(app: &Router, server: &MockServer) -> String {
    mount_token_endpoint(server).await;

    let login = send(app, Method::GET, "/api/auth/login", None, None).await;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
    let pkce_cookie = session_cookie(&login).expect("login sets session cookie");

    let callback = send(
        app,
        Method::GET,
        "/api/auth/callback/salesforce?code=aPrxTestCode",
        Some(&pkce_cookie),
        None,
    )
    .await;
    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&callback), "/insights");
    session_cookie(&callback).expect("callback sets session cookie")
}
