//! Notes and note sharing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use notewiz_core::{
    CreateNoteRequest, CreateNotificationRequest, DocumentRepository, Note, NoteAccess, NoteShare,
    NoteShareRepository, NoteRepository, NotificationKind, UpdateNoteRequest, UserRepository,
};

use super::notify;
use crate::auth::RequireAuth;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ShareNoteRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub can_edit: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateShareRequest {
    pub can_edit: bool,
}

/// Load a note together with what `viewer` may do with it.
pub(crate) async fn load_with_access(
    state: &AppState,
    note_id: Uuid,
    viewer: Uuid,
) -> Result<(Note, NoteAccess), ApiError> {
    let note = state
        .db
        .notes
        .get(note_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Note {} not found", note_id)))?;

    if note.user_id == viewer {
        return Ok((note, NoteAccess::Owner));
    }

    let share = state.db.note_shares.find(note_id, viewer).await?;
    let is_friend = if share.is_none() && !note.is_private {
        state.friendships.are_friends(note.user_id, viewer).await?
    } else {
        false
    };

    let access = NoteAccess::evaluate(&note, viewer, share.as_ref(), is_friend);
    Ok((note, access))
}

async fn require_owner(state: &AppState, note_id: Uuid, viewer: Uuid) -> Result<Note, ApiError> {
    let (note, access) = load_with_access(state, note_id, viewer).await?;
    if !access.is_owner() {
        return Err(ApiError::Forbidden(
            "Only the owner can do this".to_string(),
        ));
    }
    Ok(note)
}

/// The caller's notes, pinned first.
#[utoipa::path(get, path = "/api/notes", tag = "Notes",
    responses((status = 200, body = [Note])))]
pub async fn list_notes(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.db.notes.list_for_user(auth.user_id()).await?))
}

/// Notes other users have shared with the caller.
#[utoipa::path(get, path = "/api/notes/shared", tag = "Notes",
    responses((status = 200, body = [Note])))]
pub async fn list_shared_notes(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.db.notes.list_shared_with(auth.user_id()).await?))
}

#[utoipa::path(post, path = "/api/notes", tag = "Notes",
    request_body = CreateNoteRequest,
    responses((status = 201, body = Note), (status = 400)))]
pub async fn create_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    if let Some(document_id) = req.document_id {
        let owned = state
            .db
            .documents
            .get(document_id)
            .await?
            .is_some_and(|d| d.user_id == auth.user_id());
        if !owned {
            return Err(ApiError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }
    }

    let note = state.db.notes.insert(auth.user_id(), req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(get, path = "/api/notes/{id}", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id")),
    responses((status = 200, body = Note), (status = 403), (status = 404)))]
pub async fn get_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, ApiError> {
    let (note, access) = load_with_access(&state, id, auth.user_id()).await?;
    if !access.can_read() {
        return Err(ApiError::Forbidden(
            "Not allowed to view this note".to_string(),
        ));
    }
    Ok(Json(note))
}

/// Update a note. Editors may change content; only the owner may change privacy.
#[utoipa::path(put, path = "/api/notes/{id}", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id")),
    request_body = UpdateNoteRequest,
    responses((status = 200, body = Note), (status = 403), (status = 404)))]
pub async fn update_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<Note>, ApiError> {
    let (_, access) = load_with_access(&state, id, auth.user_id()).await?;
    if !access.can_edit() {
        return Err(ApiError::Forbidden(
            "Not allowed to edit this note".to_string(),
        ));
    }
    if req.is_private.is_some() && !access.is_owner() {
        return Err(ApiError::Forbidden(
            "Only the owner can change note privacy".to_string(),
        ));
    }
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    Ok(Json(state.db.notes.update(id, req).await?))
}

#[utoipa::path(delete, path = "/api/notes/{id}", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id")),
    responses((status = 204), (status = 403), (status = 404)))]
pub async fn delete_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_owner(&state, id, auth.user_id()).await?;
    state.db.notes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// SHARES
// =============================================================================

/// Shares of a note; visible to the owner and to share recipients.
#[utoipa::path(get, path = "/api/notes/{id}/shares", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id")),
    responses((status = 200, body = [NoteShare]), (status = 403), (status = 404)))]
pub async fn list_shares(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<NoteShare>>, ApiError> {
    let (_, access) = load_with_access(&state, id, auth.user_id()).await?;
    let is_recipient = matches!(access, NoteAccess::Read | NoteAccess::Edit)
        && state.db.note_shares.find(id, auth.user_id()).await?.is_some();
    if !access.is_owner() && !is_recipient {
        return Err(ApiError::Forbidden(
            "Not allowed to view shares of this note".to_string(),
        ));
    }
    Ok(Json(state.db.note_shares.list_for_note(id).await?))
}

#[utoipa::path(post, path = "/api/notes/{id}/shares", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id")),
    request_body = ShareNoteRequest,
    responses((status = 201, body = NoteShare), (status = 400), (status = 403), (status = 404), (status = 409)))]
pub async fn share_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<ShareNoteRequest>,
) -> Result<(StatusCode, Json<NoteShare>), ApiError> {
    let note = require_owner(&state, id, auth.user_id()).await?;
    if req.user_id == auth.user_id() {
        return Err(ApiError::BadRequest(
            "Cannot share a note with yourself".to_string(),
        ));
    }
    if !state.db.users.exists(req.user_id).await? {
        return Err(ApiError::NotFound(format!("User {} not found", req.user_id)));
    }

    let share = state
        .db
        .note_shares
        .insert(note.id, req.user_id, req.can_edit)
        .await?;

    notify(
        &state,
        CreateNotificationRequest {
            user_id: req.user_id,
            title: "Note shared with you".to_string(),
            message: format!("{} shared \"{}\" with you", auth.user().username, note.title),
            kind: NotificationKind::NoteShared,
            related_id: Some(note.id),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(share)))
}

/// Load a share and check it belongs to `note_id`.
async fn share_of_note(
    state: &AppState,
    note_id: Uuid,
    share_id: Uuid,
) -> Result<NoteShare, ApiError> {
    state
        .db
        .note_shares
        .get(share_id)
        .await?
        .filter(|s| s.note_id == note_id)
        .ok_or_else(|| ApiError::NotFound(format!("Share {} not found", share_id)))
}

#[utoipa::path(put, path = "/api/notes/{id}/shares/{share_id}", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id"), ("share_id" = Uuid, Path, description = "Share id")),
    request_body = UpdateShareRequest,
    responses((status = 200, body = NoteShare), (status = 403), (status = 404)))]
pub async fn update_share(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((id, share_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateShareRequest>,
) -> Result<Json<NoteShare>, ApiError> {
    require_owner(&state, id, auth.user_id()).await?;
    share_of_note(&state, id, share_id).await?;
    Ok(Json(
        state
            .db
            .note_shares
            .set_can_edit(share_id, req.can_edit)
            .await?,
    ))
}

#[utoipa::path(delete, path = "/api/notes/{id}/shares/{share_id}", tag = "Notes",
    params(("id" = Uuid, Path, description = "Note id"), ("share_id" = Uuid, Path, description = "Share id")),
    responses((status = 204), (status = 403), (status = 404)))]
pub async fn delete_share(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((id, share_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    require_owner(&state, id, auth.user_id()).await?;
    share_of_note(&state, id, share_id).await?;
    state.db.note_shares.delete(share_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
