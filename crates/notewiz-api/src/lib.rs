//! # notewiz-api
//!
//! HTTP API for the NoteWiz backend: accounts, notes, tasks, documents,
//! notifications, friendships and the rate-limited AI assistant.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use notewiz_core::{AiRateLimiter, AuthTokenRepository, FriendshipService};
use notewiz_db::Database;

pub use config::AppConfig;
pub use error::ApiError;

use handlers::{ai, documents, drawings, friends, health, notes, notifications, tasks, users};
use services::ChatBackend;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub friendships: FriendshipService,
    pub rate_limiter: Arc<AiRateLimiter>,
    pub ai_chat: Arc<dyn ChatBackend>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: Database,
        rate_limiter: Arc<AiRateLimiter>,
        ai_chat: Arc<dyn ChatBackend>,
        config: AppConfig,
    ) -> Self {
        let friendships = FriendshipService::new(db.friendships.clone());
        Self {
            db,
            friendships,
            rate_limiter,
            ai_chat,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// OPENAPI
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "NoteWiz API",
        description = "Notes, tasks, documents, friendships and an AI assistant"
    ),
    paths(
        health::health_check,
        users::register, users::login, users::logout, users::me, users::get_user,
        notes::list_notes, notes::list_shared_notes, notes::create_note, notes::get_note,
        notes::update_note, notes::delete_note, notes::list_shares, notes::share_note,
        notes::update_share, notes::delete_share,
        drawings::list_drawings, drawings::save_drawing, drawings::update_drawing,
        drawings::delete_drawing,
        tasks::list_tasks, tasks::create_task, tasks::get_task, tasks::update_task,
        tasks::delete_task,
        notifications::list_notifications, notifications::mark_read,
        notifications::mark_all_read,
        documents::upload_document, documents::list_documents, documents::get_document,
        documents::delete_document,
        friends::send_request, friends::list_requests, friends::respond_to_request,
        friends::list_friendships, friends::remove_friendship,
        ai::chat, ai::usage,
    ),
    components(schemas(
        notewiz_core::User, notewiz_core::Note, notewiz_core::CreateNoteRequest,
        notewiz_core::UpdateNoteRequest, notewiz_core::NoteShare, notewiz_core::NoteDrawing,
        notewiz_core::SaveDrawingRequest, notewiz_core::Task,
        notewiz_core::TaskInput, notewiz_core::Notification, notewiz_core::NotificationKind,
        notewiz_core::Document, notewiz_core::FriendshipRequest,
        notewiz_core::FriendshipRequestStatus, notewiz_core::Friendship,
        notewiz_core::ChatMessage, notewiz_core::RateLimitUsage,
        users::RegisterRequest, users::LoginRequest, users::LoginResponse,
        notes::ShareNoteRequest, notes::UpdateShareRequest,
        documents::DocumentDetail,
        friends::SendFriendRequest, friends::RespondFriendRequest,
        ai::ChatRequest, ai::ChatResponse,
    )),
    tags(
        (name = "Users", description = "Registration and bearer-token login"),
        (name = "Notes", description = "Notes, note sharing and drawings"),
        (name = "Tasks", description = "To-do items"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Documents", description = "Uploads with text extraction"),
        (name = "Friendships", description = "Friend requests and friendships"),
        (name = "AI", description = "Rate-limited AI assistant"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

// =============================================================================
// ROUTER
// =============================================================================

/// Parse CORS origins, skipping invalid entries.
pub fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

/// Identity resolution outside the AI limiter, so the limiter sees the caller.
pub fn with_request_guards<S>(
    router: Router<S>,
    tokens: Arc<dyn AuthTokenRepository>,
    limiter: Arc<AiRateLimiter>,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::ai_rate_limit,
        ))
        .layer(axum::middleware::from_fn_with_state(
            tokens,
            auth::resolve_identity,
        ))
}

pub fn build_router(state: AppState) -> Router {
    let tokens: Arc<dyn AuthTokenRepository> = state.db.auth_tokens.clone();
    let limiter = state.rate_limiter.clone();
    let max_upload_bytes = state.config.max_upload_bytes;
    let allowed_origins = parse_allowed_origins(&state.config.allowed_origins);

    let api = Router::new()
        // Users
        .route("/api/users/register", post(users::register))
        .route("/api/users/login", post(users::login))
        .route("/api/users/logout", post(users::logout))
        .route("/api/users/me", get(users::me))
        .route("/api/users/:id", get(users::get_user))
        // Notes
        .route("/api/notes", get(notes::list_notes).post(notes::create_note))
        .route("/api/notes/shared", get(notes::list_shared_notes))
        .route(
            "/api/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route(
            "/api/notes/:id/shares",
            get(notes::list_shares).post(notes::share_note),
        )
        .route(
            "/api/notes/:id/shares/:share_id",
            put(notes::update_share).delete(notes::delete_share),
        )
        .route(
            "/api/notes/:id/drawings",
            get(drawings::list_drawings).post(drawings::save_drawing),
        )
        .route(
            "/api/notes/:id/drawings/:drawing_id",
            put(drawings::update_drawing).delete(drawings::delete_drawing),
        )
        // Tasks
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        // Notifications
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route("/api/notifications/:id/read", put(notifications::mark_read))
        // Documents
        .route(
            "/api/documents",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route(
            "/api/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
        // Friendships
        .route("/api/friendships", get(friends::list_friendships))
        .route(
            "/api/friendships/requests",
            get(friends::list_requests).post(friends::send_request),
        )
        .route(
            "/api/friendships/requests/:id",
            put(friends::respond_to_request),
        )
        .route("/api/friendships/:id", axum::routing::delete(friends::remove_friendship))
        // AI
        .route("/api/ai/chat", post(ai::chat))
        .route("/api/ai/usage", get(ai::usage));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(with_request_guards(api, tokens, limiter));

    app.layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes + 64 * 1024))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins_skips_invalid() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "bad\norigin".to_string(),
        ];
        let parsed = parse_allowed_origins(&origins);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], "http://localhost:3000");
    }

    #[test]
    fn test_request_ids_are_v7() {
        let mut make = MakeRequestUuidV7;
        let req = axum::http::Request::new(());
        let id = make.make_request_id(&req).unwrap();
        let parsed = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_openapi_lists_ai_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/ai/chat"));
        assert!(doc.paths.paths.contains_key("/api/friendships/requests/{id}"));
        assert!(doc.paths.paths.contains_key("/api/notes/{id}/drawings/{drawing_id}"));
    }
}
