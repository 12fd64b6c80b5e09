//! NoteWiz API server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notewiz_core::defaults::AI_RATE_LIMIT_PURGE_INTERVAL_SECS;
use notewiz_core::logging::subsystem;
use notewiz_core::{
    AiRateLimiter, ConfigRateLimitSettings, CounterStore, MemoryCounterStore,
};
use notewiz_db::Database;

use notewiz_api::config::{AppConfig, RateLimitBackend};
use notewiz_api::services::{DeepSeekClient, RedisCounterStore};
use notewiz_api::{build_router, AppState};

/// How often expired bearer tokens are deleted.
const TOKEN_PURGE_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "notewiz_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notewiz_api=debug,notewiz_core=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notewiz-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env();

    let db = Database::connect_with_config(&config.database_url, config.db_pool).await?;
    db.migrate().await?;
    info!("Database connected and migrated");

    let tokens = db.auth_tokens.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(TOKEN_PURGE_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            match tokens.purge_expired(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => info!(subsystem = subsystem::AUTH, count = removed, "Purged expired tokens"),
                Err(e) => warn!(subsystem = subsystem::AUTH, error = %e, "Token purge failed"),
            }
        }
    });

    let counter_store: Arc<dyn CounterStore> = match config.rate_limit_backend {
        RateLimitBackend::Memory => {
            let store = Arc::new(MemoryCounterStore::new());
            store
                .clone()
                .spawn_purge_task(Duration::from_secs(AI_RATE_LIMIT_PURGE_INTERVAL_SECS));
            info!(backend = "memory", "AI rate limit store ready");
            store as Arc<dyn CounterStore>
        }
        RateLimitBackend::Redis => {
            let store = RedisCounterStore::connect(&config.redis_url).await?;
            info!(backend = "redis", "AI rate limit store ready");
            Arc::new(store) as Arc<dyn CounterStore>
        }
    };
    let rate_limiter = Arc::new(AiRateLimiter::new(
        counter_store,
        Arc::new(ConfigRateLimitSettings::new(
            config.rate_limit_settings_file.clone(),
        )),
    ));

    let ai_chat = Arc::new(DeepSeekClient::new(
        config.ai_endpoint.clone(),
        config.ai_api_key.clone(),
        config.ai_timeout_secs,
    )?);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(db, rate_limiter, ai_chat, config);
    let app = build_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
