//! Centralized default constants for the NoteWiz backend.
//!
//! Shared defaults live here so the API, repositories and domain rules
//! agree on the same values.

// =============================================================================
// AI RATE LIMITING
// =============================================================================

/// Path namespace guarded by the AI rate limiter.
pub const AI_PATH_PREFIX: &str = "/api/ai";

/// Counter key prefix; the user id is appended.
pub const AI_RATE_LIMIT_KEY_PREFIX: &str = "ai_ratelimit_";

/// Configuration key for the maximum AI calls per window.
pub const AI_RATE_LIMIT_MAX_REQUESTS_KEY: &str = "AI:RateLimit:MaxRequests";

/// Configuration key for the window length in minutes.
pub const AI_RATE_LIMIT_WINDOW_MINUTES_KEY: &str = "AI:RateLimit:TimeWindowMinutes";

/// Default maximum AI calls per window.
pub const AI_RATE_LIMIT_MAX_REQUESTS: u32 = 100;

/// Default window length in minutes.
pub const AI_RATE_LIMIT_WINDOW_MINUTES: u32 = 60;

/// How often the in-memory counter store drops expired windows.
pub const AI_RATE_LIMIT_PURGE_INTERVAL_SECS: u64 = 60;

// =============================================================================
// AI CHAT
// =============================================================================

/// Default chat-completions endpoint.
pub const AI_CHAT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";

/// Model name sent upstream and recorded in the interaction log.
pub const AI_CHAT_MODEL: &str = "deepseek-chat";

/// Default completion token budget.
pub const AI_CHAT_MAX_TOKENS: u32 = 1024;

/// Default sampling temperature.
pub const AI_CHAT_TEMPERATURE: f32 = 0.7;

/// Maximum prompt length in characters.
pub const AI_CHAT_PROMPT_MAX_CHARS: usize = 1000;

/// Cost per token in USD used for the interaction log.
pub const AI_COST_PER_TOKEN: f64 = 0.000_002;

/// Upstream request timeout in seconds.
pub const AI_CHAT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// AUTH
// =============================================================================

/// Prefix of opaque bearer tokens.
pub const AUTH_TOKEN_PREFIX: &str = "nw_at_";

/// Random characters after the prefix.
pub const AUTH_TOKEN_LENGTH: usize = 48;

/// Default token lifetime in minutes.
pub const AUTH_TOKEN_TTL_MINUTES: i64 = 60;

/// Minimum password length.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Maximum password length.
pub const PASSWORD_MAX_LENGTH: usize = 100;

/// Maximum username length.
pub const USERNAME_MAX_LENGTH: usize = 50;

/// Maximum full name length.
pub const FULL_NAME_MAX_LENGTH: usize = 100;

// =============================================================================
// NOTES & TASKS
// =============================================================================

/// Default note color.
pub const NOTE_COLOR: &str = "#FFFFFF";

/// Largest accepted drawing payload (serialized strokes) in bytes.
pub const DRAWING_DATA_MAX_BYTES: usize = 1024 * 1024;

/// Maximum task title length.
pub const TASK_TITLE_MAX_LENGTH: usize = 200;

/// Maximum task description length.
pub const TASK_DESCRIPTION_MAX_LENGTH: usize = 500;

/// Lowest (most urgent) task priority.
pub const TASK_PRIORITY_MIN: i16 = 1;

/// Highest task priority, also the default.
pub const TASK_PRIORITY_MAX: i16 = 3;

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Default upload size limit (20 MiB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default directory for uploaded documents.
pub const FILE_STORAGE_PATH: &str = "uploads/documents";

/// Timeout for the `pdftotext` subprocess.
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 5000;
