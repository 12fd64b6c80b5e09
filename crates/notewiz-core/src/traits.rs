//! Core traits for NoteWiz storage abstractions.
//!
//! The PostgreSQL crate implements the repositories; the friendship and
//! counter stores also have in-memory implementations for tests and
//! single-instance deployments.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER & AUTH REPOSITORIES
// =============================================================================

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Duplicate emails fail with `Conflict`.
    async fn insert(&self, req: CreateUserRequest) -> Result<User>;

    /// Fetch a user by id.
    async fn get(&self, id: Uuid) -> Result<Option<User>>;

    /// Fetch a user and password hash by email (case-insensitive).
    async fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>>;

    /// Check whether a user exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;
}

/// Repository for opaque bearer tokens.
#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    /// Persist a token hash.
    async fn insert(&self, req: CreateAuthTokenRequest) -> Result<Uuid>;

    /// Resolve an unexpired, unrevoked token hash to its user.
    async fn resolve(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>>;

    /// Revoke a token. Returns false when no live token matched.
    async fn revoke(&self, token_hash: &str) -> Result<bool>;
}

// =============================================================================
// NOTE REPOSITORIES
// =============================================================================

/// Repository for note CRUD operations.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn insert(&self, user_id: Uuid, req: CreateNoteRequest) -> Result<Note>;

    async fn get(&self, id: Uuid) -> Result<Option<Note>>;

    /// List a user's notes, pinned first, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Note>>;

    /// Notes shared with `user_id` by other users.
    async fn list_shared_with(&self, user_id: Uuid) -> Result<Vec<Note>>;

    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Delete a note and its shares.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Ids of notes linked to a document.
    async fn ids_for_document(&self, document_id: Uuid) -> Result<Vec<Uuid>>;
}

/// Repository for note shares.
#[async_trait]
pub trait NoteShareRepository: Send + Sync {
    /// Share a note. Sharing twice with the same user fails with `Conflict`.
    async fn insert(&self, note_id: Uuid, shared_with_user_id: Uuid, can_edit: bool)
        -> Result<NoteShare>;

    async fn get(&self, id: Uuid) -> Result<Option<NoteShare>>;

    /// The share granting `user_id` access to `note_id`, if any.
    async fn find(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<NoteShare>>;

    async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<NoteShare>>;

    async fn set_can_edit(&self, id: Uuid, can_edit: bool) -> Result<NoteShare>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Repository for note drawings.
#[async_trait]
pub trait NoteDrawingRepository: Send + Sync {
    async fn insert(&self, note_id: Uuid, drawing_data: &str) -> Result<NoteDrawing>;

    async fn get(&self, id: Uuid) -> Result<Option<NoteDrawing>>;

    /// Drawings of a note, oldest first.
    async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<NoteDrawing>>;

    /// Replace the stroke data. Fails with `NotFound` for an unknown id.
    async fn update(&self, id: Uuid, drawing_data: &str) -> Result<NoteDrawing>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

// =============================================================================
// TASK, NOTIFICATION, DOCUMENT, AI REPOSITORIES
// =============================================================================

/// Repository for tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, user_id: Uuid, input: TaskInput, now: DateTime<Utc>) -> Result<Task>;

    async fn get(&self, id: Uuid) -> Result<Option<Task>>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Task>>;

    /// Replace a task's fields; `completed_at` follows the completion flag.
    async fn update(&self, id: Uuid, input: TaskInput, now: DateTime<Utc>) -> Result<Task>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Repository for notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, req: CreateNotificationRequest) -> Result<Notification>;

    async fn get(&self, id: Uuid) -> Result<Option<Notification>>;

    async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>>;

    async fn mark_read(&self, id: Uuid) -> Result<()>;

    /// Mark every unread notification read. Returns the number updated.
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;
}

/// Repository for uploaded documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, req: CreateDocumentRequest) -> Result<Document>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Document>>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Append-only log of AI calls.
#[async_trait]
pub trait AiInteractionRepository: Send + Sync {
    async fn insert(&self, req: CreateAiInteractionRequest) -> Result<Uuid>;
}

// =============================================================================
// FRIENDSHIP STORE
// =============================================================================

/// Persistence for the friend request state machine.
///
/// Implementations must make `send_request` atomic per unordered user pair
/// and `respond` atomic per request, applying the rules in
/// [`crate::friendship`] inside that critical section.
#[async_trait]
pub trait FriendshipStore: Send + Sync {
    /// Create a Pending request from `sender` to `receiver`.
    async fn send_request(
        &self,
        sender: Uuid,
        receiver: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FriendshipRequest>;

    /// Resolve a Pending request. Returns the updated request and, on
    /// acceptance, the created friendship.
    async fn respond(
        &self,
        request_id: Uuid,
        decision: FriendshipRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<(FriendshipRequest, Option<Friendship>)>;

    /// Delete a friendship. Missing rows fail with `NotFound`.
    async fn remove_friendship(&self, friendship_id: Uuid) -> Result<()>;

    /// True when a friendship exists in either direction.
    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool>;

    async fn get_request(&self, request_id: Uuid) -> Result<Option<FriendshipRequest>>;

    /// Requests where the user is sender or receiver, newest first.
    async fn list_requests(&self, user_id: Uuid) -> Result<Vec<FriendshipRequest>>;

    async fn get_friendship(&self, friendship_id: Uuid) -> Result<Option<Friendship>>;

    /// Friendships on either side of the user, newest first.
    async fn list_friendships(&self, user_id: Uuid) -> Result<Vec<Friendship>>;
}

// =============================================================================
// RATE LIMIT COUNTERS
// =============================================================================

/// A fixed-window counter for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct RateLimitCounter {
    pub count: u32,
    pub expires_at: DateTime<Utc>,
}

/// Result of an atomic check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDecision {
    /// The request was counted.
    Admitted(RateLimitCounter),
    /// The window is exhausted; nothing changed.
    Limited(RateLimitCounter),
}

/// Keyed counters with absolute expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically apply the fixed-window rule for `key`:
    /// open a window at count 1 when none is live, reject at `max`,
    /// otherwise increment without touching the expiry.
    async fn hit(
        &self,
        key: &str,
        max: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<CounterDecision>;

    /// Read the live counter for `key` without changing it.
    async fn peek(&self, key: &str, now: DateTime<Utc>) -> Result<Option<RateLimitCounter>>;
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
