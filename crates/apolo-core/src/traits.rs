//! Collaborator traits
//!
//! The engine talks to storage, caches, locks and event consumers only
//! through these abstractions so handlers can run against in-process
//! implementations in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::time::Duration;

use crate::models::{Account, ActionPlan, Actions, Cdr, Destination, ThresholdEvent};
use crate::AppResult;

/// Transaction id meaning "outside any transaction"
pub const NON_TRANSACTIONAL: &str = "";

/// Account, action and destination storage.
///
/// Every call carries a transaction id that implementations pass through
/// unchanged. Getters fail with `AppError::NotFound` for missing keys;
/// deletes of missing keys succeed.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_account(&self, id: &str) -> AppResult<Account>;

    async fn set_account(&self, account: &Account) -> AppResult<()>;

    async fn remove_account(&self, id: &str) -> AppResult<()>;

    async fn get_actions(&self, id: &str, skip_cache: bool, transaction_id: &str)
        -> AppResult<Actions>;

    async fn set_actions(&self, id: &str, actions: &Actions, transaction_id: &str) -> AppResult<()>;

    async fn get_action_plan(
        &self,
        id: &str,
        skip_cache: bool,
        transaction_id: &str,
    ) -> AppResult<ActionPlan>;

    async fn set_action_plan(
        &self,
        id: &str,
        plan: &ActionPlan,
        overwrite: bool,
        transaction_id: &str,
    ) -> AppResult<()>;

    async fn remove_action_plan(&self, id: &str, transaction_id: &str) -> AppResult<()>;

    async fn get_destination(
        &self,
        id: &str,
        skip_cache: bool,
        transaction_id: &str,
    ) -> AppResult<Destination>;

    async fn set_destination(&self, destination: &Destination, transaction_id: &str)
        -> AppResult<()>;

    /// Destination ids indexed under a prefix
    async fn get_reverse_destination(
        &self,
        prefix: &str,
        skip_cache: bool,
        transaction_id: &str,
    ) -> AppResult<Vec<String>>;

    /// Move `old`'s prefixes in the reverse index to the ones of `new`
    async fn update_reverse_destination(
        &self,
        old: &Destination,
        new: &Destination,
        transaction_id: &str,
    ) -> AppResult<()>;

    async fn get_account_action_plans(
        &self,
        account_id: &str,
        skip_cache: bool,
        transaction_id: &str,
    ) -> AppResult<Vec<String>>;

    async fn set_account_action_plans(
        &self,
        account_id: &str,
        plan_ids: &[String],
        overwrite: bool,
    ) -> AppResult<()>;

    /// Remove `plan_ids` from the account's membership index; `None` drops the index
    async fn rem_account_action_plans(
        &self,
        account_id: &str,
        plan_ids: Option<&[String]>,
    ) -> AppResult<()>;
}

/// Cache invalidation and reload hook
#[async_trait]
pub trait CacheReloader: Send + Sync {
    /// Reload `keys` under `prefix` from storage, dropping the cached
    /// entries first when `invalidate_first` is set
    async fn reload(&self, prefix: &str, keys: &[String], invalidate_first: bool) -> AppResult<()>;

    /// Cached JSON for a key, if present
    async fn get_cached(&self, prefix: &str, key: &str) -> AppResult<Option<Value>>;
}

/// CDR persistence
#[async_trait]
pub trait CdrStorage: Send + Sync {
    async fn set_cdr(&self, cdr: &Cdr, allow_update: bool) -> AppResult<()>;
}

/// Consumer of threshold events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: ThresholdEvent) -> AppResult<()>;
}

/// Proof of a held named lock, handed back on release
pub struct LockHandle {
    pub name: String,
    pub token: String,
    guard: Option<Box<dyn Any + Send + Sync>>,
}

impl LockHandle {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            guard: None,
        }
    }

    /// Attach an in-process guard released when the handle drops
    pub fn with_guard<G: Any + Send + Sync>(mut self, guard: G) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("name", &self.name)
            .field("token", &self.token)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Named advisory mutual exclusion
#[async_trait]
pub trait LockService: Send + Sync {
    /// Wait for the lock; `None` waits indefinitely
    async fn lock(&self, name: &str, timeout: Option<Duration>) -> AppResult<LockHandle>;

    async fn unlock(&self, handle: LockHandle) -> AppResult<()>;
}
