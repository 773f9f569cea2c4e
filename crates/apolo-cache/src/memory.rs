//! In-process cache
//!
//! Same reload contract as the Redis cache, kept in a process-local map.
//! Used for single-node deployments and tests.

use apolo_core::traits::{CacheReloader, DataStore};
use apolo_core::AppResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{keys, loader};

pub struct MemoryCache {
    store: Arc<dyn DataStore>,
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, prefix: &str, id: &str) -> bool {
        self.entries
            .read()
            .contains_key(&keys::cache_key(prefix, id))
    }
}

#[async_trait]
impl CacheReloader for MemoryCache {
    async fn reload(&self, prefix: &str, ids: &[String], invalidate_first: bool) -> AppResult<()> {
        for id in ids {
            let key = keys::cache_key(prefix, id);
            if invalidate_first {
                self.entries.write().remove(&key);
            } else if self.entries.read().contains_key(&key) {
                continue;
            }
            let value = loader::load_entry(self.store.as_ref(), prefix, id).await?;
            self.entries.write().insert(key, value);
        }
        debug!(prefix, count = ids.len(), "Cache reloaded");
        Ok(())
    }

    async fn get_cached(&self, prefix: &str, id: &str) -> AppResult<Option<Value>> {
        Ok(self
            .entries
            .read()
            .get(&keys::cache_key(prefix, id))
            .cloned())
    }
}
