//! Action handlers, grouped by concern

pub mod account_removal;
pub mod balance;
pub mod cdrlog;
pub mod destinations;
pub mod lifecycle;
pub mod notify;
pub mod rpc;

use apolo_core::models::Account;
use apolo_core::{AppError, AppResult};

/// The account a handler needs, or `NilAccount`
pub(crate) fn require_account(account: Option<&mut Account>) -> AppResult<&mut Account> {
    account.ok_or(AppError::NilAccount)
}

#[cfg(test)]
pub(crate) mod tests_support {
    use apolo_cache::{Guardian, MemoryCache};
    use apolo_core::config::AppConfig;
    use apolo_core::models::{balance_types, Account, Balance};
    use apolo_db::MemoryDataStore;
    use std::sync::Arc;

    use crate::context::EngineContext;

    /// Context over in-process collaborators, sharing `store`
    pub fn context_with_store(store: Arc<MemoryDataStore>) -> EngineContext {
        let cache = Arc::new(MemoryCache::new(store.clone()));
        EngineContext::new(&AppConfig::default(), store, cache, Guardian::local())
            .expect("context")
    }

    pub fn context() -> EngineContext {
        context_with_store(Arc::new(MemoryDataStore::new()))
    }

    /// `cgrates.org:1001` with one monetary balance
    pub fn money_account(value: f64) -> Account {
        let mut account = Account::new("cgrates.org", "1001");
        account
            .balance_map
            .insert(balance_types::MONETARY.to_string(), vec![Balance::new(value)]);
        account
    }
}
