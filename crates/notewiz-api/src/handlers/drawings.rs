//! Freehand drawings attached to notes.
//!
//! Anyone who can read a note can list its drawings; saving, replacing and
//! deleting need edit access (owner or an editing share).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use notewiz_core::logging::subsystem;
use notewiz_core::{NoteAccess, NoteDrawing, NoteDrawingRepository, SaveDrawingRequest};

use super::notes::load_with_access;
use crate::auth::RequireAuth;
use crate::{ApiError, AppState};

fn ensure_access(access: NoteAccess, write: bool) -> Result<(), ApiError> {
    match (write, access) {
        (false, a) if a.can_read() => Ok(()),
        (true, a) if a.can_edit() => Ok(()),
        (false, _) => Err(ApiError::Forbidden(
            "Not allowed to view this note".to_string(),
        )),
        (true, _) => Err(ApiError::Forbidden(
            "Not allowed to edit this note".to_string(),
        )),
    }
}

/// Load a drawing and check it belongs to `note_id`.
async fn drawing_of_note(
    state: &AppState,
    note_id: Uuid,
    drawing_id: Uuid,
) -> Result<NoteDrawing, ApiError> {
    state
        .db
        .drawings
        .get(drawing_id)
        .await?
        .filter(|d| d.note_id == note_id)
        .ok_or_else(|| ApiError::NotFound(format!("Drawing {} not found", drawing_id)))
}

#[utoipa::path(get, path = "/api/notes/{id}/drawings", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id")),
    responses((status = 200, body = [NoteDrawing]), (status = 403), (status = 404)))]
pub async fn list_drawings(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<NoteDrawing>>, ApiError> {
    let (_, access) = load_with_access(&state, id, auth.user_id()).await?;
    ensure_access(access, false)?;
    Ok(Json(state.db.drawings.list_for_note(id).await?))
}

#[utoipa::path(post, path = "/api/notes/{id}/drawings", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id")),
    request_body = SaveDrawingRequest,
    responses((status = 201, body = NoteDrawing), (status = 400), (status = 403), (status = 404)))]
pub async fn save_drawing(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<SaveDrawingRequest>,
) -> Result<(StatusCode, Json<NoteDrawing>), ApiError> {
    let (_, access) = load_with_access(&state, id, auth.user_id()).await?;
    ensure_access(access, true)?;
    req.validate()?;

    let drawing = state.db.drawings.insert(id, &req.drawing_data).await?;
    debug!(
        subsystem = subsystem::DRAWINGS,
        op = "save",
        note_id = %id,
        drawing_id = %drawing.id,
        bytes = req.drawing_data.len(),
        "Drawing saved"
    );
    Ok((StatusCode::CREATED, Json(drawing)))
}

#[utoipa::path(put, path = "/api/notes/{id}/drawings/{drawing_id}", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id"), ("drawing_id" = Uuid, Path, description = "Drawing id")),
    request_body = SaveDrawingRequest,
    responses((status = 200, body = NoteDrawing), (status = 400), (status = 403), (status = 404)))]
pub async fn update_drawing(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((id, drawing_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SaveDrawingRequest>,
) -> Result<Json<NoteDrawing>, ApiError> {
    let (_, access) = load_with_access(&state, id, auth.user_id()).await?;
    ensure_access(access, true)?;
    req.validate()?;
    drawing_of_note(&state, id, drawing_id).await?;

    Ok(Json(
        state
            .db
            .drawings
            .update(drawing_id, &req.drawing_data)
            .await?,
    ))
}

#[utoipa::path(delete, path = "/api/notes/{id}/drawings/{drawing_id}", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id"), ("drawing_id" = Uuid, Path, description = "Drawing id")),
    responses((status = 204), (status = 403), (status = 404)))]
pub async fn delete_drawing(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((id, drawing_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let (_, access) = load_with_access(&state, id, auth.user_id()).await?;
    ensure_access(access, true)?;
    drawing_of_note(&state, id, drawing_id).await?;

    if !state.db.drawings.delete(drawing_id).await? {
        return Err(ApiError::NotFound(format!(
            "Drawing {} not found",
            drawing_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
