//! # notewiz-core
//!
//! Core types, traits, and domain rules for the NoteWiz backend.
//!
//! This crate holds the friend request state machine, the AI rate limiter
//! and the repository traits the storage and HTTP crates build on.

pub mod defaults;
pub mod error;
pub mod extraction;
pub mod friendship;
pub mod logging;
pub mod models;
pub mod rate_limit;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types at crate root
pub use error::{Error, FriendshipError, RateLimitError, Result};
pub use extraction::{extract_text, DocumentKind};
pub use friendship::{parse_decision, FriendshipService};
pub use models::*;
pub use rate_limit::{
    is_ai_path, AiRateLimiter, ConfigRateLimitSettings, MemoryCounterStore, RateLimitOptions,
    RateLimitOutcome, RateLimitSettings, RateLimitUsage,
};
pub use traits::*;
