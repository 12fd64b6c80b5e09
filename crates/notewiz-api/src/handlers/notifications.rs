use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use notewiz_core::{Notification, NotificationRepository};

use crate::auth::RequireAuth;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListNotificationsQuery {
    /// Only unread notifications.
    #[serde(default)]
    pub unread: bool,
}

#[utoipa::path(get, path = "/api/notifications", tag = "Notifications",
    params(ListNotificationsQuery),
    responses((status = 200, body = [Notification])))]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(
        state
            .db
            .notifications
            .list_for_user(auth.user_id(), query.unread)
            .await?,
    ))
}

#[utoipa::path(put, path = "/api/notifications/{id}/read", tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses((status = 204), (status = 403), (status = 404)))]
pub async fn mark_read(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let notification = state
        .db
        .notifications
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Notification {} not found", id)))?;
    if notification.user_id != auth.user_id() {
        return Err(ApiError::Forbidden(
            "Not allowed to modify this notification".to_string(),
        ));
    }
    state.db.notifications.mark_read(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(put, path = "/api/notifications/read-all", tag = "Notifications",
    responses((status = 200, description = "Number of notifications marked read")))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state.db.notifications.mark_all_read(auth.user_id()).await?;
    Ok(Json(json!({ "updated": updated })))
}
