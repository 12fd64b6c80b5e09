//! Friend requests and friendships.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use notewiz_core::{
    parse_decision, CreateNotificationRequest, Friendship, FriendshipRequest,
    FriendshipRequestStatus, NotificationKind, UserRepository,
};

use super::notify;
use crate::auth::RequireAuth;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SendFriendRequest {
    pub receiver_id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RespondFriendRequest {
    /// "Accepted" or "Rejected"
    pub status: String,
}

#[utoipa::path(post, path = "/api/friendships/requests", tag = "Friendships",
    request_body = SendFriendRequest,
    responses((status = 201, body = FriendshipRequest), (status = 400), (status = 404), (status = 409)))]
pub async fn send_request(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<SendFriendRequest>,
) -> Result<(StatusCode, Json<FriendshipRequest>), ApiError> {
    let sender = auth.user_id();
    // Self-requests are reported as InvalidRequest even though the user exists.
    if req.receiver_id != sender && !state.db.users.exists(req.receiver_id).await? {
        return Err(ApiError::NotFound(format!(
            "User {} not found",
            req.receiver_id
        )));
    }

    let request = state
        .friendships
        .send_request(sender, req.receiver_id)
        .await?;

    notify(
        &state,
        CreateNotificationRequest {
            user_id: request.receiver_id,
            title: "New friend request".to_string(),
            message: format!("{} sent you a friend request", auth.user().username),
            kind: NotificationKind::FriendRequest,
            related_id: Some(request.id),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(request)))
}

/// Requests the caller sent or received, newest first.
#[utoipa::path(get, path = "/api/friendships/requests", tag = "Friendships",
    responses((status = 200, body = [FriendshipRequest])))]
pub async fn list_requests(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<FriendshipRequest>>, ApiError> {
    Ok(Json(state.friendships.list_requests(auth.user_id()).await?))
}

/// Accept or reject a request. Only its receiver may respond.
#[utoipa::path(put, path = "/api/friendships/requests/{id}", tag = "Friendships",
    params(("id" = Uuid, Path, description = "Friend request id")),
    request_body = RespondFriendRequest,
    responses((status = 200, body = FriendshipRequest), (status = 400), (status = 403), (status = 404), (status = 409)))]
pub async fn respond_to_request(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondFriendRequest>,
) -> Result<Json<FriendshipRequest>, ApiError> {
    let decision = parse_decision(&req.status)?;

    let existing = state
        .friendships
        .get_request(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Friend request {} not found", id)))?;
    if existing.receiver_id != auth.user_id() {
        return Err(ApiError::Forbidden(
            "Only the receiver can respond to a friend request".to_string(),
        ));
    }

    let (request, _friendship) = state.friendships.respond(id, decision).await?;

    if request.status == FriendshipRequestStatus::Accepted {
        notify(
            &state,
            CreateNotificationRequest {
                user_id: request.sender_id,
                title: "Friend request accepted".to_string(),
                message: format!("{} accepted your friend request", auth.user().username),
                kind: NotificationKind::FriendRequestAccepted,
                related_id: Some(request.id),
            },
        )
        .await;
    }

    Ok(Json(request))
}

/// The caller's friendships, whichever side they are on.
#[utoipa::path(get, path = "/api/friendships", tag = "Friendships",
    responses((status = 200, body = [Friendship])))]
pub async fn list_friendships(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Friendship>>, ApiError> {
    Ok(Json(state.friendships.list_friendships(auth.user_id()).await?))
}

#[utoipa::path(delete, path = "/api/friendships/{id}", tag = "Friendships",
    params(("id" = Uuid, Path, description = "Friendship id")),
    responses((status = 204), (status = 403), (status = 404)))]
pub async fn remove_friendship(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let friendship = state
        .friendships
        .get_friendship(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Friendship {} not found", id)))?;
    if !friendship.involves(auth.user_id()) {
        return Err(ApiError::Forbidden(
            "Only a participant can remove a friendship".to_string(),
        ));
    }

    state.friendships.remove_friendship(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
