//! Fixed-window rate limiting for the AI namespace.
//!
//! Each authenticated user owns one counter keyed `ai_ratelimit_<user id>`.
//! The first call opens a window of `TimeWindowMinutes`; calls are admitted
//! until the count reaches `MaxRequests`, after which the caller is refused
//! until the window expires. Limits are re-read on every request.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::defaults::{
    AI_PATH_PREFIX, AI_RATE_LIMIT_KEY_PREFIX, AI_RATE_LIMIT_MAX_REQUESTS,
    AI_RATE_LIMIT_MAX_REQUESTS_KEY, AI_RATE_LIMIT_WINDOW_MINUTES,
    AI_RATE_LIMIT_WINDOW_MINUTES_KEY,
};
use crate::error::{RateLimitError, Result};
use crate::logging::{component, subsystem};
use crate::traits::{Clock, CounterDecision, CounterStore, RateLimitCounter, SystemClock};

/// True for `/api/ai` and anything beneath it (`/api/ai/...`), ignoring
/// ASCII case.
pub fn is_ai_path(path: &str) -> bool {
    let split = AI_PATH_PREFIX.len();
    match (path.get(..split), path.get(split..)) {
        (Some(head), Some(rest)) => {
            head.eq_ignore_ascii_case(AI_PATH_PREFIX) && (rest.is_empty() || rest.starts_with('/'))
        }
        _ => false,
    }
}

/// Counter key for a user.
pub fn counter_key(user_id: Uuid) -> String {
    format!("{}{}", AI_RATE_LIMIT_KEY_PREFIX, user_id)
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Effective limits for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOptions {
    pub max_requests: u32,
    pub window_minutes: u32,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            max_requests: AI_RATE_LIMIT_MAX_REQUESTS,
            window_minutes: AI_RATE_LIMIT_WINDOW_MINUTES,
        }
    }
}

impl RateLimitOptions {
    pub fn window(&self) -> Duration {
        Duration::minutes(i64::from(self.window_minutes))
    }
}

/// Source of the current limits, consulted per request.
#[async_trait]
pub trait RateLimitSettings: Send + Sync {
    async fn current(&self) -> RateLimitOptions;
}

#[async_trait]
impl RateLimitSettings for RateLimitOptions {
    async fn current(&self) -> RateLimitOptions {
        *self
    }
}

/// Limits from a settings file, falling back to the process environment.
///
/// The file is re-read on every call, so editing it changes the limits of a
/// running server. A key present in the file wins over the environment:
/// `dotenvy::dotenv()` copies `.env` into the environment at startup, which
/// would otherwise pin the startup values.
///
/// Hierarchical keys map to variable names by upper-casing and replacing
/// `:` with `__`, so `AI:RateLimit:MaxRequests` is
/// `AI__RATELIMIT__MAXREQUESTS`. `MaxRequests` may be 0 (only the request
/// that opens a window is admitted); `TimeWindowMinutes` must be at least 1.
#[derive(Debug, Clone, Default)]
pub struct ConfigRateLimitSettings {
    file: Option<PathBuf>,
}

impl ConfigRateLimitSettings {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    /// Environment variable name for a hierarchical configuration key.
    pub fn env_key(config_key: &str) -> String {
        config_key.replace(':', "__").to_uppercase()
    }

    /// Key/value pairs of the settings file, with upper-cased keys.
    async fn file_values(&self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        let Some(path) = &self.file else {
            return values;
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return values,
            Err(e) => {
                warn!(
                    subsystem = subsystem::RATE_LIMIT,
                    component = component::SETTINGS,
                    path = %path.display(),
                    error = %e,
                    "Cannot read rate limit settings file"
                );
                return values;
            }
        };

        for item in dotenvy::from_read_iter(bytes.as_slice()) {
            match item {
                Ok((key, value)) => {
                    values.insert(key.to_ascii_uppercase(), value);
                }
                Err(e) => warn!(
                    subsystem = subsystem::RATE_LIMIT,
                    component = component::SETTINGS,
                    path = %path.display(),
                    error = %e,
                    "Skipping malformed settings line"
                ),
            }
        }
        values
    }

    fn resolve(file: &HashMap<String, String>, config_key: &str, default: u32, min: u32) -> u32 {
        let var = Self::env_key(config_key);
        let Some(raw) = file.get(&var).cloned().or_else(|| std::env::var(&var).ok()) else {
            return default;
        };
        match raw.trim().parse::<u32>() {
            Ok(value) if value >= min => value,
            _ => {
                warn!(
                    subsystem = subsystem::RATE_LIMIT,
                    component = component::SETTINGS,
                    key = config_key,
                    value = %raw,
                    default,
                    "Invalid rate limit setting, using default"
                );
                default
            }
        }
    }
}

#[async_trait]
impl RateLimitSettings for ConfigRateLimitSettings {
    async fn current(&self) -> RateLimitOptions {
        let file = self.file_values().await;
        RateLimitOptions {
            max_requests: Self::resolve(
                &file,
                AI_RATE_LIMIT_MAX_REQUESTS_KEY,
                AI_RATE_LIMIT_MAX_REQUESTS,
                0,
            ),
            window_minutes: Self::resolve(
                &file,
                AI_RATE_LIMIT_WINDOW_MINUTES_KEY,
                AI_RATE_LIMIT_WINDOW_MINUTES,
                1,
            ),
        }
    }
}

// =============================================================================
// IN-MEMORY COUNTER STORE
// =============================================================================

/// Process-local counter store.
///
/// Check-and-increment runs under the map's per-key entry lock, so two
/// requests for the same user never both observe the same count.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, RateLimitCounter>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired windows. Returns the number removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.expires_at > now);
        before.saturating_sub(self.counters.len())
    }

    /// Periodically purge expired windows until the runtime shuts down.
    pub fn spawn_purge_task(
        self: Arc<Self>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = self.purge_expired(Utc::now());
                if removed > 0 {
                    debug!(
                        subsystem = subsystem::RATE_LIMIT,
                        component = component::MEMORY_STORE,
                        count = removed,
                        "Purged expired rate limit windows"
                    );
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(
        &self,
        key: &str,
        max: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<CounterDecision> {
        let fresh = RateLimitCounter {
            count: 1,
            expires_at: now + window,
        };

        let decision = match self.counters.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                CounterDecision::Admitted(fresh)
            }
            Entry::Occupied(mut slot) => {
                let counter = slot.get_mut();
                if counter.expires_at <= now {
                    *counter = fresh;
                    CounterDecision::Admitted(fresh)
                } else if counter.count >= max {
                    CounterDecision::Limited(*counter)
                } else {
                    counter.count += 1;
                    CounterDecision::Admitted(*counter)
                }
            }
        };
        Ok(decision)
    }

    async fn peek(&self, key: &str, now: DateTime<Utc>) -> Result<Option<RateLimitCounter>> {
        Ok(self
            .counters
            .get(key)
            .map(|c| *c)
            .filter(|c| c.expires_at > now))
    }
}

// =============================================================================
// LIMITER
// =============================================================================

/// What the limiter did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    /// Not an AI path; nothing was counted.
    Bypassed,
    /// Counted and allowed through.
    Admitted(RateLimitCounter),
}

/// A caller's view of their current window.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RateLimitUsage {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
    pub window_minutes: u32,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Per-user limiter for the AI namespace.
#[derive(Clone)]
pub struct AiRateLimiter {
    store: Arc<dyn CounterStore>,
    settings: Arc<dyn RateLimitSettings>,
    clock: Arc<dyn Clock>,
}

impl AiRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, settings: Arc<dyn RateLimitSettings>) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn CounterStore>,
        settings: Arc<dyn RateLimitSettings>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            settings,
            clock,
        }
    }

    /// Decide whether a request to `path` by `user` may proceed.
    ///
    /// Identity is checked before any counter is touched; a refused request
    /// leaves the counter unchanged.
    pub async fn check(&self, path: &str, user: Option<Uuid>) -> Result<RateLimitOutcome> {
        if !is_ai_path(path) {
            return Ok(RateLimitOutcome::Bypassed);
        }

        let Some(user_id) = user else {
            warn!(subsystem = subsystem::RATE_LIMIT, op = "check", path, "AI request without identity");
            return Err(RateLimitError::Unauthorized.into());
        };

        let options = self.settings.current().await;
        let key = counter_key(user_id);
        let decision = self
            .store
            .hit(&key, options.max_requests, options.window(), self.clock.now())
            .await?;

        match decision {
            CounterDecision::Admitted(counter) => {
                debug!(
                    subsystem = subsystem::RATE_LIMIT,
                    op = "check",
                    user_id = %user_id,
                    count = counter.count,
                    limit = options.max_requests,
                    "AI request admitted"
                );
                Ok(RateLimitOutcome::Admitted(counter))
            }
            CounterDecision::Limited(counter) => {
                warn!(
                    subsystem = subsystem::RATE_LIMIT,
                    op = "check",
                    user_id = %user_id,
                    count = counter.count,
                    limit = options.max_requests,
                    expires_at = %counter.expires_at,
                    "AI rate limit exceeded"
                );
                Err(RateLimitError::RateLimited.into())
            }
        }
    }

    /// Current window for a user without counting a request.
    pub async fn usage(&self, user_id: Uuid) -> Result<RateLimitUsage> {
        let options = self.settings.current().await;
        let counter = self
            .store
            .peek(&counter_key(user_id), self.clock.now())
            .await?;
        let count = counter.map(|c| c.count).unwrap_or(0);

        Ok(RateLimitUsage {
            count,
            limit: options.max_requests,
            remaining: options.max_requests.saturating_sub(count),
            window_minutes: options.window_minutes,
            expires_at: counter.map(|c| c.expires_at),
        })
    }
}
