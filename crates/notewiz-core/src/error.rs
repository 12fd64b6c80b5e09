//! Error types for the NoteWiz backend.

use thiserror::Error;

/// Result type alias using NoteWiz's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Friend request lifecycle violations.
///
/// These are state conflicts or bad input surfaced directly to the caller;
/// none of them is retried.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipError {
    /// A friendship already exists between the two users.
    #[error("Users are already friends")]
    AlreadyFriends,

    /// A pending request already exists between the two users (either direction).
    #[error("A pending friend request already exists between these users")]
    DuplicateRequest,

    /// The request itself is malformed (e.g. a user befriending themselves).
    #[error("Invalid friend request")]
    InvalidRequest,

    /// The request has already been accepted or rejected.
    #[error("Friend request has already been resolved")]
    AlreadyResolved,

    /// The decision is not a terminal status.
    #[error("Invalid friend request status")]
    InvalidStatus,
}

/// AI rate limiter rejections.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// No authenticated identity on an AI request.
    #[error("Unauthorized")]
    Unauthorized,

    /// The caller's fixed window is exhausted.
    #[error("Too many requests. Please try again later.")]
    RateLimited,
}

/// Core error type for NoteWiz operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Counter cache (Redis) operation failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Friend request state machine rejected the operation
    #[error(transparent)]
    Friendship(#[from] FriendshipError),

    /// AI rate limiter rejected the request
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Text extraction failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Upstream AI provider failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not allowed)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// True when the error is a Postgres unique-constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
