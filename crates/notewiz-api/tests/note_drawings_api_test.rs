//! Note drawings over HTTP, including who may read and draw.
//!
//! Requires a live database at `DATABASE_URL`; run with `--ignored`.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{call, setup_app, sign_up};

const STROKES: &str = r#"{"strokes":[{"points":[[0,0],[10,12]],"width":2}]}"#;

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_drawings_follow_note_access() {
    let app = setup_app().await;
    let (_, owner_token) = sign_up(&app, "nora").await;
    let (reader, reader_token) = sign_up(&app, "otto").await;
    let (_, stranger_token) = sign_up(&app, "pia").await;

    let (status, note) = call(
        &app,
        "POST",
        "/api/notes",
        Some(&owner_token),
        Some(json!({ "title": "Floor plan" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = note["id"].as_str().unwrap().to_string();
    let drawings_uri = format!("/api/notes/{}/drawings", note_id);

    let (status, drawing) = call(
        &app,
        "POST",
        &drawings_uri,
        Some(&owner_token),
        Some(json!({ "drawing_data": STROKES })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{drawing}");
    assert_eq!(drawing["drawing_data"], STROKES);
    let drawing_uri = format!("{}/{}", drawings_uri, drawing["id"].as_str().unwrap());

    let (status, _) = call(
        &app,
        "POST",
        &drawings_uri,
        Some(&owner_token),
        Some(json!({ "drawing_data": "{broken" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Private note, no share.
    let (status, _) = call(&app, "GET", &drawings_uri, Some(&stranger_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, share) = call(
        &app,
        "POST",
        &format!("/api/notes/{}/shares", note_id),
        Some(&owner_token),
        Some(json!({ "user_id": reader, "can_edit": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = call(&app, "GET", &drawings_uri, Some(&reader_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        "PUT",
        &drawing_uri,
        Some(&reader_token),
        Some(json!({ "drawing_data": "{}" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/notes/{}/shares/{}", note_id, share["id"].as_str().unwrap()),
        Some(&owner_token),
        Some(json!({ "can_edit": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, updated) = call(
        &app,
        "PUT",
        &drawing_uri,
        Some(&reader_token),
        Some(json!({ "drawing_data": "{\"strokes\":[]}" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["drawing_data"], "{\"strokes\":[]}");

    // A drawing is only addressable through its own note.
    let (status, other) = call(
        &app,
        "POST",
        "/api/notes",
        Some(&owner_token),
        Some(json!({ "title": "Elsewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let foreign_uri = format!(
        "/api/notes/{}/drawings/{}",
        other["id"].as_str().unwrap(),
        drawing["id"].as_str().unwrap()
    );
    let (status, _) = call(&app, "DELETE", &foreign_uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "DELETE", &drawing_uri, Some(&reader_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &drawing_uri, Some(&reader_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
