//! Document upload with text extraction.
//!
//! # Multipart Fields
//!
//! - `file` (required): PDF, plain text or markdown
//! - `title` (optional): defaults to the file name without extension

use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use notewiz_core::{
    extract_text, CreateDocumentRequest, Document, DocumentKind, DocumentRepository,
    NoteRepository,
};

use crate::auth::RequireAuth;
use crate::{ApiError, AppState};
use notewiz_core::logging::subsystem;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    /// Notes created from this document.
    pub note_ids: Vec<Uuid>,
}

/// Title for an upload without an explicit one.
fn default_title(file_name: &str) -> String {
    FsPath::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Untitled")
        .to_string()
}

async fn owned_document(state: &AppState, id: Uuid, user_id: Uuid) -> Result<Document, ApiError> {
    let document = state
        .db
        .documents
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {} not found", id)))?;
    if document.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Not allowed to access this document".to_string(),
        ));
    }
    Ok(document)
}

#[utoipa::path(post, path = "/api/documents", tag = "Documents",
    responses((status = 201, body = Document), (status = 400), (status = 413), (status = 415)))]
pub async fn upload_document(
    State(state): State<AppState>,
    auth: RequireAuth,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|c| c.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            Some("title") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                if !value.trim().is_empty() {
                    title = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| {
        ApiError::BadRequest("No file uploaded. Use field name 'file'.".to_string())
    })?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File exceeds the {} byte limit",
            state.config.max_upload_bytes
        )));
    }

    let file_name = file_name.unwrap_or_else(|| "upload".to_string());
    let kind = DocumentKind::detect(&file_name, content_type.as_deref(), &data).ok_or_else(|| {
        ApiError::UnsupportedMediaType(
            "Only PDF, plain text and markdown files are supported".to_string(),
        )
    })?;

    let storage_dir = PathBuf::from(&state.config.file_storage_path);
    tokio::fs::create_dir_all(&storage_dir)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    let stored_path = storage_dir.join(format!("{}.{}", Uuid::now_v7(), kind.extension()));
    tokio::fs::write(&stored_path, &data)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    let extracted_text = match extract_text(kind, &data).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(
                subsystem = subsystem::DOCUMENTS,
                file_name = %file_name,
                error = %e,
                "Text extraction failed, storing document without text"
            );
            None
        }
    };

    let document = state
        .db
        .documents
        .insert(CreateDocumentRequest {
            user_id: auth.user_id(),
            title: title.unwrap_or_else(|| default_title(&file_name)),
            file_name,
            file_path: stored_path.to_string_lossy().into_owned(),
            content_type: kind.mime_type().to_string(),
            file_size: data.len() as i64,
            extracted_text,
        })
        .await?;

    info!(
        subsystem = subsystem::DOCUMENTS,
        op = "upload",
        user_id = %auth.user_id(),
        document_id = %document.id,
        file_size = document.file_size,
        "Document stored"
    );
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(get, path = "/api/documents", tag = "Documents",
    responses((status = 200, body = [Document])))]
pub async fn list_documents(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.db.documents.list_for_user(auth.user_id()).await?))
}

#[utoipa::path(get, path = "/api/documents/{id}", tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 200, body = DocumentDetail), (status = 403), (status = 404)))]
pub async fn get_document(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let document = owned_document(&state, id, auth.user_id()).await?;
    let note_ids = state.db.notes.ids_for_document(id).await?;
    Ok(Json(DocumentDetail { document, note_ids }))
}

/// Delete a document and its stored file. A file already gone is not an error.
#[utoipa::path(delete, path = "/api/documents/{id}", tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 204), (status = 403), (status = 404)))]
pub async fn delete_document(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let document = owned_document(&state, id, auth.user_id()).await?;
    state.db.documents.delete(id).await?;

    if let Err(e) = tokio::fs::remove_file(&document.file_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                subsystem = subsystem::DOCUMENTS,
                document_id = %id,
                path = %document.file_path,
                error = %e,
                "Failed to remove stored file"
            );
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title_uses_file_stem() {
        assert_eq!(default_title("Lecture 3.pdf"), "Lecture 3");
        assert_eq!(default_title("notes.tar.md"), "notes.tar");
        assert_eq!(default_title(""), "Untitled");
    }
}
