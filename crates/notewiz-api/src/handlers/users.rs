//! Registration, login and profile endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use notewiz_core::{
    AuthTokenRepository, CreateAuthTokenRequest, CreateUserRequest, User, UserRepository,
};
use notewiz_db::{generate_token, hash_token};

use crate::auth::{hash_password, validate_registration, verify_password, RequireAuth};
use crate::{ApiError, AppState};
use notewiz_core::logging::subsystem;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_info: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// Opaque bearer token; only returned once.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Register a new account.
#[utoipa::path(post, path = "/api/users/register", tag = "Users",
    request_body = RegisterRequest,
    responses((status = 201, body = User), (status = 400), (status = 409)))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    validate_registration(&req.username, &req.full_name, &req.email, &req.password)?;
    let password_hash = hash_password(&req.password)?;

    let user = state
        .db
        .users
        .insert(CreateUserRequest {
            username: req.username.trim().to_string(),
            full_name: req.full_name.trim().to_string(),
            email: req.email.trim().to_string(),
            password_hash,
        })
        .await?;

    info!(subsystem = subsystem::AUTH, op = "register", user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a bearer token.
#[utoipa::path(post, path = "/api/users/login", tag = "Users",
    request_body = LoginRequest,
    responses((status = 200, body = LoginResponse), (status = 401)))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let credentials = state
        .db
        .users
        .get_credentials_by_email(req.email.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&credentials.password_hash, &req.password) {
        return Err(invalid());
    }

    let token = generate_token();
    let expires_at = Utc::now() + Duration::minutes(state.config.auth_token_ttl_minutes);
    state
        .db
        .auth_tokens
        .insert(CreateAuthTokenRequest {
            user_id: credentials.user.id,
            token_hash: hash_token(&token),
            expires_at,
            device_info: req.device_info,
        })
        .await?;

    info!(subsystem = subsystem::AUTH, op = "login", user_id = %credentials.user.id, "User logged in");
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: credentials.user,
    }))
}

/// Revoke the presented token.
#[utoipa::path(post, path = "/api/users/logout", tag = "Users",
    responses((status = 204), (status = 401)))]
pub async fn logout(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<StatusCode, ApiError> {
    state.db.auth_tokens.revoke(&auth.0.token_hash).await?;
    info!(subsystem = subsystem::AUTH, op = "logout", user_id = %auth.user_id(), "Token revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own profile.
#[utoipa::path(get, path = "/api/users/me", tag = "Users",
    responses((status = 200, body = User), (status = 401)))]
pub async fn me(auth: RequireAuth) -> Json<User> {
    Json(auth.0.user)
}

/// Another user's profile; self or admin only.
#[utoipa::path(get, path = "/api/users/{id}", tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, body = User), (status = 403), (status = 404)))]
pub async fn get_user(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    if auth.user_id() != id && !auth.user().is_admin {
        return Err(ApiError::Forbidden(
            "Not allowed to view this user".to_string(),
        ));
    }
    let user = state
        .db
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(user))
}
