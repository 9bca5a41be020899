//! Test utilities and common setup.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header},
};
use roseanne::api::{self, AppState};
use roseanne::auth::{AuthConfig, AuthState, TokenAuthenticator};
use roseanne::celebrity::MemoryCelebrityStore;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Router plus a handle on its backing store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryCelebrityStore>,
}

impl TestApp {
    /// Send one request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Dev-mode auth with no failed-login delay.
pub fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::development();
    config.failed_login_delay_ms = 0;
    config
}

/// App over a seeded in-memory store.
pub async fn test_app() -> TestApp {
    test_app_with_auth(test_auth_config()).await
}

pub async fn test_app_with_auth(config: AuthConfig) -> TestApp {
    let authenticator = TokenAuthenticator::from_config(&config).expect("valid test auth config");
    let store = Arc::new(
        MemoryCelebrityStore::seeded()
            .await
            .expect("seeded memory store"),
    );
    let state = AppState::new(
        AuthState::new(authenticator),
        store.clone(),
        Duration::from_secs(5),
    );
    TestApp {
        router: api::create_router(state),
        store,
    }
}

/// App plus a valid admin bearer token.
pub async fn test_app_with_token() -> (TestApp, String) {
    let app = test_app().await;
    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD})),
            None,
        ))
        .await;
    let body = body_json(response).await;
    let token = body["token"]
        .as_str()
        .expect("login returns a token")
        .to_string();
    (app, token)
}

/// Build a request with an optional JSON body and bearer token.
pub fn json_request(
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
