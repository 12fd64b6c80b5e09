//! End-to-end friendship flow over HTTP.
//!
//! Requires a live database at `DATABASE_URL`; run with `--ignored`.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{call, setup_app, sign_up};

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_friend_request_flow() {
    let app = setup_app().await;
    let (alice, alice_token) = sign_up(&app, "alice").await;
    let (bob, bob_token) = sign_up(&app, "bob").await;

    let (status, request) = call(
        &app,
        "POST",
        "/api/friendships/requests",
        Some(&alice_token),
        Some(json!({ "receiver_id": bob })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "Pending");
    let request_id = request["id"].as_str().unwrap().to_string();

    // Reverse direction while pending.
    let (status, body) = call(
        &app,
        "POST",
        "/api/friendships/requests",
        Some(&bob_token),
        Some(json!({ "receiver_id": alice })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Sender cannot answer their own request.
    let uri = format!("/api/friendships/requests/{}", request_id);
    let (status, _) = call(
        &app,
        "PUT",
        &uri,
        Some(&alice_token),
        Some(json!({ "status": "Accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "PUT",
        &uri,
        Some(&bob_token),
        Some(json!({ "status": "Pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, accepted) = call(
        &app,
        "PUT",
        &uri,
        Some(&bob_token),
        Some(json!({ "status": "Accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "Accepted");

    let (status, _) = call(
        &app,
        "PUT",
        &uri,
        Some(&bob_token),
        Some(json!({ "status": "Rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, friendships) = call(&app, "GET", "/api/friendships", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let friendship_id = friendships[0]["id"].as_str().unwrap().to_string();

    let (status, notifications) =
        call(&app, "GET", "/api/notifications?unread=true", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(notifications
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["kind"] == "friend_request_accepted"));

    let uri = format!("/api/friendships/{}", friendship_id);
    let (status, _) = call(&app, "DELETE", &uri, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &uri, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_ai_chat_is_rate_limited_per_user() {
    let app = setup_app().await;
    let (_, token) = sign_up(&app, "carol").await;

    for _ in 0..2 {
        let (status, reply) = call(
            &app,
            "POST",
            "/api/ai/chat",
            Some(&token),
            Some(json!({ "prompt": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["response_text"], "echo: hello");
        assert_eq!(reply["tokens_used"], 7);
    }

    let (status, body) = call(
        &app,
        "POST",
        "/api/ai/chat",
        Some(&token),
        Some(json!({ "prompt": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, Value::String("Too many requests. Please try again later.".into()));

    let (status, body) = call(
        &app,
        "POST",
        "/api/ai/chat",
        None,
        Some(json!({ "prompt": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, Value::String("Unauthorized".into()));
}
