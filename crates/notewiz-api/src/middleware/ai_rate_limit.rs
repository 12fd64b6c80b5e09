//! Fixed-window limiter for the `/api/ai` namespace.
//!
//! Must sit inside `resolve_identity` so the caller is already known.
//! Rejections are written as plain text, not the JSON error envelope.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use notewiz_core::{AiRateLimiter, Error, RateLimitError};

use crate::auth::AuthUser;
use crate::error::ApiError;

/// Plain-text response for a limiter rejection.
pub fn rejection_response(err: RateLimitError) -> Response {
    let status = match err {
        RateLimitError::Unauthorized => StatusCode::UNAUTHORIZED,
        RateLimitError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
    };
    (status, err.to_string()).into_response()
}

pub async fn ai_rate_limit(
    State(limiter): State<Arc<AiRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let user_id = req.extensions().get::<AuthUser>().map(|auth| auth.user.id);

    match limiter.check(req.uri().path(), user_id).await {
        Ok(_) => next.run(req).await,
        Err(Error::RateLimit(err)) => rejection_response(err),
        // Counter store failure; do not admit blindly.
        Err(err) => ApiError::from(err).into_response(),
    }
}
