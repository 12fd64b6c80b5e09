//! Structured logging vocabulary shared by every NoteWiz crate.
//!
//! Events carry `subsystem` and, where useful, `component` fields whose
//! values come from this module, so log aggregation can filter on a fixed
//! set of names across the API, repository and domain layers:
//!
//! ```rust,ignore
//! use notewiz_core::logging::{component, subsystem};
//!
//! warn!(subsystem = subsystem::RATE_LIMIT, component = component::REDIS_STORE, "...");
//! ```
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue or rejected request (rate limit hit) |
//! | INFO  | Lifecycle events, state transitions (friend request accepted) |
//! | DEBUG | Decision points, admitted requests, config choices |
//! | TRACE | Per-row iteration |

/// Values of the `subsystem` field.
pub mod subsystem {
    pub const API: &str = "api";
    pub const AUTH: &str = "auth";
    pub const AI: &str = "ai";
    pub const DB: &str = "db";
    pub const DOCUMENTS: &str = "documents";
    pub const DRAWINGS: &str = "drawings";
    pub const EXTRACTION: &str = "extraction";
    pub const FRIENDSHIP: &str = "friendship";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const RATE_LIMIT: &str = "rate_limit";

    pub(crate) const ALL: &[&str] = &[
        API,
        AUTH,
        AI,
        DB,
        DOCUMENTS,
        DRAWINGS,
        EXTRACTION,
        FRIENDSHIP,
        NOTIFICATIONS,
        RATE_LIMIT,
    ];
}

/// Values of the `component` field.
pub mod component {
    pub const POOL: &str = "pool";
    pub const FRIENDSHIP_STORE: &str = "friendship_store";
    pub const MEMORY_STORE: &str = "memory_store";
    pub const REDIS_STORE: &str = "redis_store";
    pub const SETTINGS: &str = "settings";
    pub const PDF_TEXT: &str = "pdf_text";

    pub(crate) const ALL: &[&str] = &[
        POOL,
        FRIENDSHIP_STORE,
        MEMORY_STORE,
        REDIS_STORE,
        SETTINGS,
        PDF_TEXT,
    ];
}
