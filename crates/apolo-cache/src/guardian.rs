//! Named locks
//!
//! `LocalLocker` serializes within one process; `RedisLocker` serializes
//! across nodes sharing a Redis instance. `Guardian` runs a critical
//! section under a lock and releases it whatever the section returns.

use apolo_core::error::AppError;
use apolo_core::traits::{LockHandle, LockService};
use apolo_core::AppResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{keys, map_redis_error};

/// Interval between attempts on a contended Redis lock
const REDIS_LOCK_POLL: Duration = Duration::from_millis(10);

/// Deletes the lock key only if it still holds our token
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// In-process named locks
#[derive(Default)]
pub struct LocalLocker {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LocalLocker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockService for LocalLocker {
    async fn lock(&self, name: &str, timeout: Option<Duration>) -> AppResult<LockHandle> {
        let mutex = self
            .locks
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();

        let guard = match timeout {
            Some(limit) => tokio::time::timeout(limit, mutex.lock_owned())
                .await
                .map_err(|_| AppError::LockTimeout(name.to_string()))?,
            None => mutex.lock_owned().await,
        };
        debug!(lock = name, "Lock acquired");
        Ok(LockHandle::new(name, Uuid::new_v4().to_string()).with_guard(guard))
    }

    async fn unlock(&self, handle: LockHandle) -> AppResult<()> {
        debug!(lock = %handle.name, "Lock released");
        drop(handle);
        Ok(())
    }
}

/// Redis-backed named locks (`SET key token NX PX ttl`)
#[derive(Clone)]
pub struct RedisLocker {
    manager: ConnectionManager,
    ttl: Duration,
}

impl RedisLocker {
    pub fn new(manager: ConnectionManager, ttl: Duration) -> Self {
        Self { manager, ttl }
    }

    async fn try_acquire(&self, key: &str, token: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl LockService for RedisLocker {
    async fn lock(&self, name: &str, timeout: Option<Duration>) -> AppResult<LockHandle> {
        let key = keys::lock_key(name);
        let token = Uuid::new_v4().to_string();
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if self.try_acquire(&key, &token).await? {
                debug!(lock = name, "Lock acquired");
                return Ok(LockHandle::new(name, token));
            }
            if deadline.map_or(false, |d| Instant::now() >= d) {
                return Err(AppError::LockTimeout(name.to_string()));
            }
            tokio::time::sleep(REDIS_LOCK_POLL).await;
        }
    }

    async fn unlock(&self, handle: LockHandle) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let deleted: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(keys::lock_key(&handle.name))
            .arg(&handle.token)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        if deleted == 0 {
            warn!(lock = %handle.name, "Lock expired before release");
        }
        Ok(())
    }
}

/// Runs critical sections under named locks
#[derive(Clone)]
pub struct Guardian {
    locker: Arc<dyn LockService>,
}

impl Guardian {
    pub fn new(locker: Arc<dyn LockService>) -> Self {
        Self { locker }
    }

    /// Guardian over an in-process locker
    pub fn local() -> Self {
        Self::new(Arc::new(LocalLocker::new()))
    }

    /// Acquire `lock_name`, run `critical`, release, return its result.
    ///
    /// A failed release is logged and does not mask the section's result.
    pub async fn guard<T, F, Fut>(
        &self,
        lock_name: &str,
        timeout: Option<Duration>,
        critical: F,
    ) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let handle = self.locker.lock(lock_name, timeout).await?;
        let result = critical().await;
        if let Err(e) = self.locker.unlock(handle).await {
            warn!(lock = lock_name, error = %e, "Failed to release lock");
        }
        result
    }
}
