//! Server configuration from the environment.
//!
//! Environment variables:
//!   DATABASE_URL            - PostgreSQL URL (default: postgres://localhost/notewiz)
//!   HOST / PORT             - bind address (default: 0.0.0.0:5000)
//!   DB_MAX_CONNECTIONS      - pool size (default: 10)
//!   DB_MIN_CONNECTIONS      - warm connections (default: 1)
//!   DB_ACQUIRE_TIMEOUT_SECS - wait for a free connection (default: 10)
//!   FILE_STORAGE_PATH       - upload directory (default: uploads/documents)
//!   MAX_UPLOAD_BYTES        - upload size limit (default: 20 MiB)
//!   AUTH_TOKEN_TTL_MINUTES  - bearer token lifetime (default: 60)
//!   AI_RATE_LIMIT_BACKEND   - "memory" or "redis" (default: memory)
//!   REDIS_URL               - Redis URL for the redis backend
//!   ALLOWED_ORIGINS         - comma-separated CORS origins
//!   AI__DEEPSEEK__ENDPOINT  - chat-completions URL
//!   AI__DEEPSEEK__APIKEY    - chat-completions API key
//!
//!   AI_RATE_LIMIT_SETTINGS_FILE - file holding `AI__RATELIMIT__*`, re-read on
//!                             every AI request (default: .env; empty disables)
//!
//! The AI rate limit itself (`AI__RATELIMIT__*`) is read per request by
//! `ConfigRateLimitSettings`, not here.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use notewiz_db::pool::{
    PoolConfig, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS,
};

use notewiz_core::defaults::{
    AI_CHAT_ENDPOINT, AI_CHAT_TIMEOUT_SECS, AUTH_TOKEN_TTL_MINUTES, FILE_STORAGE_PATH,
    MAX_UPLOAD_BYTES, SERVER_PORT,
};

/// Where AI rate limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Process-local map; counters are lost on restart.
    Memory,
    /// Shared Redis instance for multi-instance deployments.
    Redis,
}

impl FromStr for RateLimitBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(RateLimitBackend::Memory),
            "redis" => Ok(RateLimitBackend::Redis),
            other => Err(format!("Unknown rate limit backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_pool: PoolConfig,
    pub file_storage_path: String,
    pub max_upload_bytes: usize,
    pub auth_token_ttl_minutes: i64,
    pub rate_limit_backend: RateLimitBackend,
    pub redis_url: String,
    pub rate_limit_settings_file: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub ai_endpoint: String,
    pub ai_api_key: Option<String>,
    pub ai_timeout_secs: u64,
}

/// Parse an environment variable, falling back to `default` with a warning
/// when it is set but invalid.
fn env_or<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, value = %raw, error = %e, "Invalid configuration value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Settings file consulted by the AI rate limiter on every request.
const DEFAULT_RATE_LIMIT_SETTINGS_FILE: &str = ".env";

fn settings_file(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| PathBuf::from(raw))
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let allowed_origins = env_string("ALLOWED_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            database_url: env_string("DATABASE_URL", "postgres://localhost/notewiz"),
            host: env_string("HOST", "0.0.0.0"),
            port: env_or("PORT", SERVER_PORT),
            db_pool: PoolConfig {
                max_connections: env_or("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
                min_connections: env_or("DB_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS),
                acquire_timeout: std::time::Duration::from_secs(env_or(
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    DEFAULT_ACQUIRE_TIMEOUT_SECS,
                )),
            },
            file_storage_path: env_string("FILE_STORAGE_PATH", FILE_STORAGE_PATH),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", MAX_UPLOAD_BYTES),
            auth_token_ttl_minutes: env_or("AUTH_TOKEN_TTL_MINUTES", AUTH_TOKEN_TTL_MINUTES),
            rate_limit_backend: env_or("AI_RATE_LIMIT_BACKEND", RateLimitBackend::Memory),
            redis_url: env_string("REDIS_URL", "redis://localhost:6379"),
            rate_limit_settings_file: settings_file(&env_string(
                "AI_RATE_LIMIT_SETTINGS_FILE",
                DEFAULT_RATE_LIMIT_SETTINGS_FILE,
            )),
            allowed_origins,
            ai_endpoint: env_string("AI__DEEPSEEK__ENDPOINT", AI_CHAT_ENDPOINT),
            ai_api_key: std::env::var("AI__DEEPSEEK__APIKEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ai_timeout_secs: env_or("AI_CHAT_TIMEOUT_SECS", AI_CHAT_TIMEOUT_SECS),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/notewiz".to_string(),
            host: "0.0.0.0".to_string(),
            port: SERVER_PORT,
            db_pool: PoolConfig::default(),
            file_storage_path: FILE_STORAGE_PATH.to_string(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            auth_token_ttl_minutes: AUTH_TOKEN_TTL_MINUTES,
            rate_limit_backend: RateLimitBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            rate_limit_settings_file: settings_file(DEFAULT_RATE_LIMIT_SETTINGS_FILE),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            ai_endpoint: AI_CHAT_ENDPOINT.to_string(),
            ai_api_key: None,
            ai_timeout_secs: AI_CHAT_TIMEOUT_SECS,
        }
    }
}
