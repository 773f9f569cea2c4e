//! Cache reload and named-lock layer
//!
//! Provides the `CacheReloader` implementations used by the action engine
//! after it rewrites stored objects, and the named locks that serialize
//! cross-account mutations.
//!
//! # Features
//!
//! - Redis-backed cache via ConnectionManager, with TTL on every entry
//! - In-process cache for single-node deployments and tests
//! - Local and Redis lock services plus the `Guardian` critical-section helper
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use apolo_cache::{keys, RedisCache};
//! use apolo_core::traits::{CacheReloader, DataStore};
//!
//! async fn refresh(store: Arc<dyn DataStore>) -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = RedisCache::new("redis://127.0.0.1:6379", store, 300).await?;
//!     cache
//!         .reload(keys::DESTINATION_PREFIX, &["*ddc_test".to_string()], true)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod guardian;
pub mod keys;
pub mod loader;
pub mod memory;

pub use guardian::{Guardian, LocalLocker, RedisLocker};
pub use memory::MemoryCache;

use apolo_core::error::AppError;
use apolo_core::traits::{CacheReloader, DataStore};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Redis cache implementation with connection pooling
///
/// Wraps a Redis ConnectionManager to provide efficient, multiplexed access
/// to Redis. Entries are loaded from the configured `DataStore`.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    store: Arc<dyn DataStore>,
    ttl_secs: u64,
}

impl RedisCache {
    /// Create a new Redis cache instance
    ///
    /// # Errors
    ///
    /// Returns `AppError::CacheConnection` if the connection fails
    pub async fn new(url: &str, store: Arc<dyn DataStore>, ttl_secs: u64) -> Result<Self, AppError> {
        let manager = connect(url).await?;
        Ok(Self {
            manager,
            store,
            ttl_secs,
        })
    }

    /// Ping the Redis server to check connectivity
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis ping failed: {}", e);
                AppError::Cache(format!("Ping failed: {}", e))
            })?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn flush_db(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        debug!("EXISTS {}", key);
        let mut conn = self.manager.clone();
        conn.exists(key).await.map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        debug!("DEL {}", key);
        let mut conn = self.manager.clone();
        let _: i32 = conn.del(key).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), AppError> {
        debug!("SET {} (TTL: {}s)", key, self.ttl_secs);
        let mut conn = self.manager.clone();
        let json = serde_json::to_string(value)?;
        let _: () = conn
            .set_ex(key, json, self.ttl_secs)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

#[async_trait]
impl CacheReloader for RedisCache {
    async fn reload(
        &self,
        prefix: &str,
        ids: &[String],
        invalidate_first: bool,
    ) -> Result<(), AppError> {
        for id in ids {
            let key = keys::cache_key(prefix, id);
            if invalidate_first {
                self.delete(&key).await?;
            } else if self.exists(&key).await? {
                continue;
            }
            let value = loader::load_entry(self.store.as_ref(), prefix, id).await?;
            self.set(&key, &value).await?;
        }
        debug!(prefix, count = ids.len(), "Cache reloaded");
        Ok(())
    }

    async fn get_cached(&self, prefix: &str, id: &str) -> Result<Option<Value>, AppError> {
        let key = keys::cache_key(prefix, id);
        debug!("GET {}", key);
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(&key).await.map_err(map_redis_error)?;
        raw.map(|json| serde_json::from_str(&json).map_err(AppError::from))
            .transpose()
    }
}

/// Open a managed Redis connection
pub async fn connect(url: &str) -> Result<ConnectionManager, AppError> {
    debug!("Connecting to Redis at {}", url);

    let client = Client::open(url).map_err(|e| {
        error!("Failed to create Redis client: {}", e);
        AppError::CacheConnection(format!("Invalid Redis URL: {}", e))
    })?;

    let manager = ConnectionManager::new(client).await.map_err(|e| {
        error!("Failed to establish Redis connection: {}", e);
        AppError::CacheConnection(format!("Connection failed: {}", e))
    })?;

    debug!("Redis connection established successfully");
    Ok(manager)
}

/// Convert RedisError to AppError
pub(crate) fn map_redis_error(err: RedisError) -> AppError {
    match err.kind() {
        redis::ErrorKind::IoError => {
            error!("Redis I/O error: {}", err);
            AppError::CacheConnection(format!("I/O error: {}", err))
        }
        redis::ErrorKind::TypeError => {
            warn!("Redis type error: {}", err);
            AppError::Cache(format!("Type mismatch: {}", err))
        }
        _ => {
            error!("Redis error: {}", err);
            AppError::Cache(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apolo_core::models::Destination;
    use apolo_core::traits::NON_TRANSACTIONAL;
    use apolo_db::MemoryDataStore;

    async fn setup_cache() -> (RedisCache, Arc<MemoryDataStore>) {
        let store = Arc::new(MemoryDataStore::new());
        let cache = RedisCache::new("redis://127.0.0.1:6379", store.clone(), 60)
            .await
            .expect("Failed to connect to Redis");
        cache.flush_db().await.expect("Failed to flush DB");
        (cache, store)
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_ping() {
        let (cache, _) = setup_cache().await;
        assert!(cache.ping().await.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_reload_destination() {
        let (cache, store) = setup_cache().await;
        let dest = Destination::new("NAT", vec!["49".to_string()]);
        store.set_destination(&dest, NON_TRANSACTIONAL).await.unwrap();

        cache
            .reload(keys::DESTINATION_PREFIX, &["NAT".to_string()], true)
            .await
            .unwrap();
        let cached = cache
            .get_cached(keys::DESTINATION_PREFIX, "NAT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached["Prefixes"][0], "49");
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_reload_missing_key_invalidates() {
        let (cache, _) = setup_cache().await;
        let result = cache
            .reload(keys::DESTINATION_PREFIX, &["GONE".to_string()], true)
            .await;
        assert!(result.unwrap_err().is_not_found());
        assert!(cache
            .get_cached(keys::DESTINATION_PREFIX, "GONE")
            .await
            .unwrap()
            .is_none());
    }
}
