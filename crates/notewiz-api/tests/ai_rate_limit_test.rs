//! Router-level tests for identity resolution and the AI rate limiter.
//!
//! Routes are stubs; the guards are the production ones from
//! `with_request_guards`, so layering and wire responses are exercised as
//! they run in the server.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use tower::ServiceExt;
use uuid::Uuid;

use notewiz_api::auth::RequireAuth;
use notewiz_api::with_request_guards;
use notewiz_core::mock::ManualClock;
use notewiz_core::{
    AiRateLimiter, AuthTokenRepository, CreateAuthTokenRequest, MemoryCounterStore,
    RateLimitOptions, Result, User,
};
use notewiz_db::hash_token;

const ALICE_TOKEN: &str = "nw_at_alice000000000000000000000000000000000000000000";
const BOB_TOKEN: &str = "nw_at_bob00000000000000000000000000000000000000000000";

/// Token table keyed by hash, like the real repository.
struct StaticTokens {
    users: HashMap<String, User>,
}

#[async_trait]
impl AuthTokenRepository for StaticTokens {
    async fn insert(&self, _req: CreateAuthTokenRequest) -> Result<Uuid> {
        Ok(Uuid::now_v7())
    }

    async fn resolve(&self, token_hash: &str, _now: DateTime<Utc>) -> Result<Option<User>> {
        Ok(self.users.get(token_hash).cloned())
    }

    async fn revoke(&self, _token_hash: &str) -> Result<bool> {
        Ok(false)
    }
}

fn user(name: &str) -> User {
    User {
        id: Uuid::now_v7(),
        username: name.to_string(),
        full_name: name.to_string(),
        email: format!("{}@example.test", name),
        is_admin: false,
        created_at: Utc::now(),
    }
}

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
}

fn harness(max_requests: u32, window_minutes: u32) -> Harness {
    let mut users = HashMap::new();
    users.insert(hash_token(ALICE_TOKEN), user("alice"));
    users.insert(hash_token(BOB_TOKEN), user("bob"));
    let tokens: Arc<dyn AuthTokenRepository> = Arc::new(StaticTokens { users });

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let limiter = Arc::new(AiRateLimiter::with_clock(
        Arc::new(MemoryCounterStore::new()),
        Arc::new(RateLimitOptions {
            max_requests,
            window_minutes,
        }),
        clock.clone(),
    ));

    let routes = Router::new()
        .route("/api/ai/chat", post(|| async { "answer" }))
        .route("/api/ai", get(|| async { "root" }))
        .route("/api/aix", get(|| async { "not ai" }))
        .route("/api/notes", get(|| async { "notes" }))
        .route(
            "/api/users/me",
            get(|auth: RequireAuth| async move { auth.user().username.clone() }),
        );

    Harness {
        app: with_request_guards(routes, tokens, limiter),
        clock,
    }
}

fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_anonymous_ai_request_gets_plain_unauthorized() {
    let h = harness(2, 60);

    let response = h
        .app
        .clone()
        .oneshot(request("POST", "/api/ai/chat", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Unauthorized");
}

#[tokio::test]
async fn test_unknown_token_is_treated_as_anonymous() {
    let h = harness(2, 60);
    let (status, body) = send(
        &h.app,
        request("POST", "/api/ai/chat", Some("nw_at_unknown")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Unauthorized");
}

#[tokio::test]
async fn test_third_call_in_window_is_rejected() {
    let h = harness(2, 60);

    for _ in 0..2 {
        let (status, body) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "answer");
    }

    let (status, body) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "Too many requests. Please try again later.");
}

#[tokio::test]
async fn test_window_reopens_after_expiry() {
    let h = harness(1, 60);

    let (status, _) = send(&h.app, request("GET", "/api/ai", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.app, request("GET", "/api/ai", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    h.clock.advance(Duration::minutes(59));
    let (status, _) = send(&h.app, request("GET", "/api/ai", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    h.clock.advance(Duration::minutes(1));
    let (status, _) = send(&h.app, request("GET", "/api/ai", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_limits_are_per_user() {
    let h = harness(1, 60);

    let (status, _) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = send(&h.app, request("POST", "/api/ai/chat", Some(BOB_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_non_ai_paths_are_never_limited() {
    let h = harness(1, 60);

    let _ = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
    let (status, _) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    for _ in 0..5 {
        let (status, body) = send(&h.app, request("GET", "/api/notes", Some(ALICE_TOKEN))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "notes");
    }

    // Shares the prefix but is a different segment.
    let (status, body) = send(&h.app, request("GET", "/api/aix", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "not ai");

    // Anonymous callers pass through outside the AI namespace.
    let (status, _) = send(&h.app, request("GET", "/api/notes", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_calls_do_not_extend_the_window() {
    let h = harness(1, 10);

    let (status, _) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..3 {
        h.clock.advance(Duration::minutes(3));
        let (status, _) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    // The window opened by the first call closes at minute ten.
    h.clock.advance(Duration::minutes(1));
    let (status, _) = send(&h.app, request("POST", "/api/ai/chat", Some(ALICE_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_require_auth_outside_ai_uses_json_errors() {
    let h = harness(1, 60);

    let (status, body) = send(&h.app, request("GET", "/api/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Authentication required");

    let (status, body) = send(&h.app, request("GET", "/api/users/me", Some(BOB_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "bob");
}
