//! Connection pool setup and the pool figures reported by `/health`.

use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use notewiz_core::logging::{component, subsystem};
use notewiz_core::{Error, Result};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Bounded so a request never waits forever behind a held friendship lock.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Pool sizing, usually built from `DB_*` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Repair inconsistent sizing instead of failing startup.
    ///
    /// At least one connection, `min <= max`, and a non-zero acquire timeout.
    pub fn normalized(self) -> Self {
        let max_connections = self.max_connections.max(1);
        let min_connections = self.min_connections.min(max_connections);
        let acquire_timeout = if self.acquire_timeout.is_zero() {
            Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS)
        } else {
            self.acquire_timeout
        };

        let fixed = Self {
            max_connections,
            min_connections,
            acquire_timeout,
        };
        if fixed != self {
            warn!(
                subsystem = subsystem::DB,
                component = component::POOL,
                requested = ?self,
                effective = ?fixed,
                "Adjusted inconsistent pool configuration"
            );
        }
        fixed
    }
}

/// Open a pool against `database_url`.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let config = config.normalized();
    let start = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(IDLE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = subsystem::DB,
        component = component::POOL,
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database pool ready"
    );
    Ok(pool)
}

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

impl PoolStats {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
        }
    }

    /// Every open connection is checked out.
    pub fn is_saturated(&self) -> bool {
        self.size > 0 && self.idle == 0
    }
}
