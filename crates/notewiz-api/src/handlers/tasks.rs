//! Owner-only task CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use notewiz_core::{Task, TaskInput, TaskRepository};

use crate::auth::RequireAuth;
use crate::{ApiError, AppState};

async fn owned_task(state: &AppState, id: Uuid, user_id: Uuid) -> Result<Task, ApiError> {
    let task = state
        .db
        .tasks
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;
    if task.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Not allowed to access this task".to_string(),
        ));
    }
    Ok(task)
}

#[utoipa::path(get, path = "/api/tasks", tag = "Tasks",
    responses((status = 200, body = [Task])))]
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.db.tasks.list_for_user(auth.user_id()).await?))
}

#[utoipa::path(post, path = "/api/tasks", tag = "Tasks",
    request_body = TaskInput,
    responses((status = 201, body = Task), (status = 400)))]
pub async fn create_task(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    input.validate()?;
    let task = state.db.tasks.insert(auth.user_id(), input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(get, path = "/api/tasks/{id}", tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 200, body = Task), (status = 403), (status = 404)))]
pub async fn get_task(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(owned_task(&state, id, auth.user_id()).await?))
}

#[utoipa::path(put, path = "/api/tasks/{id}", tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskInput,
    responses((status = 200, body = Task), (status = 400), (status = 403), (status = 404)))]
pub async fn update_task(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(input): Json<TaskInput>,
) -> Result<Json<Task>, ApiError> {
    owned_task(&state, id, auth.user_id()).await?;
    Ok(Json(state.db.tasks.update(id, input, Utc::now()).await?))
}

#[utoipa::path(delete, path = "/api/tasks/{id}", tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 204), (status = 403), (status = 404)))]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    owned_task(&state, id, auth.user_id()).await?;
    state.db.tasks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
