#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use llmos_dashboard::api::{AppState, create_app_state, router};
use llmos_dashboard::config::Config;
use llmos_dashboard::{init_settings, open_store};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery staple";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;
    config
}

/// App backed by a fresh in-memory store. `env` plays the role of the
/// process environment.
pub async fn spawn_app_with_env(env: &[(&str, &str)]) -> (Router, Arc<AppState>) {
    spawn_app_with_config(test_config(), env).await
}

pub async fn spawn_app_with_config(
    config: Config,
    env: &[(&str, &str)],
) -> (Router, Arc<AppState>) {
    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();

    let store = open_store(&config).await.expect("store");
    let settings = init_settings(&config, &store, Arc::new(env))
        .await
        .expect("settings");
    let state = create_app_state(config, store, settings, None)
        .await
        .expect("Failed to create app state");

    (router(state.clone()), state)
}

pub async fn spawn_app() -> Router {
    spawn_app_with_env(&[]).await.0
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

pub async fn sign_up(app: &Router, name: &str, email: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auths/signup",
        None,
        Some(json!({"name": name, "email": email, "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "sign up failed: {body}");
    body
}

pub fn token(session: &Value) -> &str {
    session["token"].as_str().expect("session token")
}
