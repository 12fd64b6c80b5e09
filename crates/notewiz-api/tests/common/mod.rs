//! Shared setup for the end-to-end API tests.
//!
//! Requires a live database at `DATABASE_URL`.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use notewiz_api::services::{ChatBackend, ChatPrompt, ChatReply};
use notewiz_api::{build_router, AppConfig, AppState};
use notewiz_core::{AiRateLimiter, MemoryCounterStore, RateLimitOptions, Result};
use notewiz_db::{Database, DEFAULT_TEST_DATABASE_URL};

const SCHEMA: &str = include_str!("../../../../migrations/20261001000000_initial.sql");

pub struct EchoChat;

#[async_trait]
impl ChatBackend for EchoChat {
    async fn complete(&self, prompt: ChatPrompt) -> Result<ChatReply> {
        Ok(ChatReply {
            text: format!("echo: {}", prompt.prompt),
            tokens_used: 7,
        })
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

pub async fn setup_app() -> Router {
    let _ = dotenvy::dotenv();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    sqlx::raw_sql(SCHEMA)
        .execute(&db.pool)
        .await
        .expect("Failed to apply schema");

    let limiter = Arc::new(AiRateLimiter::new(
        Arc::new(MemoryCounterStore::new()),
        Arc::new(RateLimitOptions {
            max_requests: 2,
            window_minutes: 60,
        }),
    ));
    let config = AppConfig {
        file_storage_path: std::env::temp_dir()
            .join("notewiz-test-uploads")
            .to_string_lossy()
            .into_owned(),
        ..AppConfig::default()
    };
    build_router(AppState::new(db, limiter, Arc::new(EchoChat), config))
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

/// Register and log in; returns (user id, bearer token).
pub async fn sign_up(app: &Router, name: &str) -> (Uuid, String) {
    let email = format!("{}-{}@example.test", name, Uuid::now_v7().simple());
    let (status, user) = call(
        app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({
            "username": name,
            "full_name": name,
            "email": email,
            "password": "secret-password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");

    let (status, login) = call(
        app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({ "email": email, "password": "secret-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{login}");

    let id = user["id"].as_str().unwrap().parse().unwrap();
    (id, login["token"].as_str().unwrap().to_string())
}
