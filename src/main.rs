//! Apolo action engine server
//!
//! Executes action lists against stored accounts over HTTP. Redis backs the
//! cache and the named locks when configured; PostgreSQL stores the CDRs
//! produced by `*cdrlog` when a database is configured.

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use apolo_cache::{Guardian, MemoryCache, RedisCache, RedisLocker};
use apolo_core::traits::{CacheReloader, DataStore};
use apolo_core::AppConfig;
use apolo_db::{create_pool, MemoryDataStore, PgCdrStorage};
use apolo_engine::{ActionExecutor, EngineContext};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "apolo_actions={lvl},apolo_engine={lvl},apolo_api={lvl},apolo_cache={lvl},apolo_db={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    let json = env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// Cache and lock collaborators: Redis when configured, in-process otherwise
async fn build_cache(
    config: &AppConfig,
    store: Arc<dyn DataStore>,
) -> anyhow::Result<(Arc<dyn CacheReloader>, Guardian)> {
    let Some(url) = config.redis.url.as_deref() else {
        warn!("No Redis configured, using in-process cache and locks");
        return Ok((Arc::new(MemoryCache::new(store)), Guardian::local()));
    };

    info!("Connecting to Redis...");
    let cache = RedisCache::new(url, store, config.redis.cache_ttl_secs)
        .await
        .context("Failed to connect Redis cache")?;
    let manager = apolo_cache::connect(url)
        .await
        .context("Failed to connect Redis locker")?;
    let locker = RedisLocker::new(manager, Duration::from_millis(config.redis.lock_ttl_ms));
    info!("Redis cache and locks ready");

    Ok((Arc::new(cache), Guardian::new(Arc::new(locker))))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!(
        "Starting Apolo action engine v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = AppConfig::load().context("Failed to load configuration")?;

    let store: Arc<dyn DataStore> = Arc::new(MemoryDataStore::new());
    let (cache, guardian) = build_cache(&config, store.clone()).await?;

    let mut ctx = EngineContext::new(&config, store, cache, guardian)
        .context("Failed to build engine context")?;
    if let Some(pool) = create_pool(&config.database).await? {
        let cdrs = PgCdrStorage::new(pool);
        cdrs.ensure_schema().await?;
        ctx = ctx.with_cdr_storage(Arc::new(cdrs));
        info!("CDR storage enabled");
    }

    let executor = web::Data::new(ActionExecutor::new(Arc::new(ctx)));

    let bind_addr = config.server_addr();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(executor.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_body",
                        "message": error_message
                    })),
                )
                .into()
            }))
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(apolo_api::configure)
    })
    .workers(config.server.workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
