//! Bearer-token identity and password handling.
//!
//! `resolve_identity` runs as an outer middleware: it looks up the presented
//! token and, when valid, stores an [`AuthUser`] in the request extensions.
//! Invalid, expired or missing tokens leave the request anonymous; handlers
//! that need a caller use the [`RequireAuth`] extractor.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::debug;

use notewiz_core::defaults::{
    AUTH_TOKEN_PREFIX, FULL_NAME_MAX_LENGTH, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH,
    USERNAME_MAX_LENGTH,
};
use notewiz_core::{AuthTokenRepository, User};
use notewiz_db::hash_token;

use crate::error::ApiError;
use notewiz_core::logging::subsystem;

/// The authenticated caller, attached to the request by `resolve_identity`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// SHA-256 of the presented token, kept for logout.
    pub token_hash: String,
}

/// Extract the raw token from an `Authorization: Bearer ...` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.starts_with(AUTH_TOKEN_PREFIX) {
        Some(token)
    } else {
        None
    }
}

/// Resolve the bearer token, if any, into an [`AuthUser`] extension.
pub async fn resolve_identity(
    State(tokens): State<Arc<dyn AuthTokenRepository>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    if let Some(token) = token {
        let token_hash = hash_token(&token);
        match tokens.resolve(&token_hash, Utc::now()).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(AuthUser { user, token_hash });
            }
            Ok(None) => {
                debug!(subsystem = subsystem::AUTH, "Bearer token not recognised, continuing anonymously");
            }
            Err(e) => return ApiError::from(e).into_response(),
        }
    }

    next.run(req).await
}

/// Extractor that requires an authenticated caller.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthUser);

impl RequireAuth {
    pub fn user(&self) -> &User {
        &self.0.user
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.0.user.id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

// =============================================================================
// PASSWORDS
// =============================================================================

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| ApiError::Internal(notewiz_core::Error::Internal(e.to_string())))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(notewiz_core::Error::Internal(e.to_string())))
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Field checks for a registration payload.
pub fn validate_registration(
    username: &str,
    full_name: &str,
    email: &str,
    password: &str,
) -> Result<(), ApiError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username must be 1 to {} characters",
            USERNAME_MAX_LENGTH
        )));
    }
    if full_name.trim().is_empty() || full_name.chars().count() > FULL_NAME_MAX_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Full name must be 1 to {} characters",
            FULL_NAME_MAX_LENGTH
        )));
    }
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(ApiError::BadRequest("Invalid email address".to_string())),
    }
    let len = password.chars().count();
    if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "Password must be {} to {} characters",
            PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH
        )));
    }
    Ok(())
}
