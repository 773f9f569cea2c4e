//! In-process data store
//!
//! Keeps accounts, action lists, action plans, destinations and the
//! membership/reverse indexes in `parking_lot` guarded maps. Deletes of
//! missing keys succeed, getters of missing keys fail with `NotFound`.

use apolo_core::models::{Account, ActionPlan, Actions, Destination};
use apolo_core::traits::DataStore;
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Default)]
pub struct MemoryDataStore {
    accounts: RwLock<HashMap<String, Account>>,
    actions: RwLock<HashMap<String, Actions>>,
    action_plans: RwLock<HashMap<String, ActionPlan>>,
    destinations: RwLock<HashMap<String, Destination>>,
    reverse_destinations: RwLock<HashMap<String, BTreeSet<String>>>,
    account_action_plans: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn get_account(&self, id: &str) -> AppResult<Account> {
        self.accounts
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    async fn set_account(&self, account: &Account) -> AppResult<()> {
        debug!(account = %account.id, "Storing account");
        self.accounts
            .write()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn remove_account(&self, id: &str) -> AppResult<()> {
        debug!(account = id, "Removing account");
        self.accounts.write().remove(id);
        Ok(())
    }

    async fn get_actions(&self, id: &str, _skip_cache: bool, _transaction_id: &str) -> AppResult<Actions> {
        self.actions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("actions {}", id)))
    }

    async fn set_actions(&self, id: &str, actions: &Actions, _transaction_id: &str) -> AppResult<()> {
        self.actions.write().insert(id.to_string(), actions.clone());
        Ok(())
    }

    async fn get_action_plan(
        &self,
        id: &str,
        _skip_cache: bool,
        _transaction_id: &str,
    ) -> AppResult<ActionPlan> {
        self.action_plans
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("action plan {}", id)))
    }

    async fn set_action_plan(
        &self,
        id: &str,
        plan: &ActionPlan,
        overwrite: bool,
        _transaction_id: &str,
    ) -> AppResult<()> {
        let mut plans = self.action_plans.write();
        match plans.get_mut(id) {
            Some(existing) if !overwrite => {
                existing
                    .account_ids
                    .extend(plan.account_ids.iter().cloned());
                existing.action_timings = plan.action_timings.clone();
            }
            _ => {
                plans.insert(id.to_string(), plan.clone());
            }
        }
        Ok(())
    }

    async fn remove_action_plan(&self, id: &str, _transaction_id: &str) -> AppResult<()> {
        self.action_plans.write().remove(id);
        Ok(())
    }

    async fn get_destination(
        &self,
        id: &str,
        _skip_cache: bool,
        _transaction_id: &str,
    ) -> AppResult<Destination> {
        self.destinations
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("destination {}", id)))
    }

    async fn set_destination(&self, destination: &Destination, _transaction_id: &str) -> AppResult<()> {
        self.destinations
            .write()
            .insert(destination.id.clone(), destination.clone());
        Ok(())
    }

    async fn get_reverse_destination(
        &self,
        prefix: &str,
        _skip_cache: bool,
        _transaction_id: &str,
    ) -> AppResult<Vec<String>> {
        self.reverse_destinations
            .read()
            .get(prefix)
            .map(|ids| ids.iter().cloned().collect())
            .ok_or_else(|| AppError::NotFound(format!("reverse destination {}", prefix)))
    }

    async fn update_reverse_destination(
        &self,
        old: &Destination,
        new: &Destination,
        _transaction_id: &str,
    ) -> AppResult<()> {
        let mut index = self.reverse_destinations.write();
        for prefix in &old.prefixes {
            if let Some(ids) = index.get_mut(prefix) {
                ids.remove(&old.id);
                if ids.is_empty() {
                    index.remove(prefix);
                }
            }
        }
        for prefix in &new.prefixes {
            index
                .entry(prefix.clone())
                .or_default()
                .insert(new.id.clone());
        }
        Ok(())
    }

    async fn get_account_action_plans(
        &self,
        account_id: &str,
        _skip_cache: bool,
        _transaction_id: &str,
    ) -> AppResult<Vec<String>> {
        self.account_action_plans
            .read()
            .get(account_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("account action plans {}", account_id)))
    }

    async fn set_account_action_plans(
        &self,
        account_id: &str,
        plan_ids: &[String],
        overwrite: bool,
    ) -> AppResult<()> {
        let mut index = self.account_action_plans.write();
        let entry = index.entry(account_id.to_string()).or_default();
        if overwrite {
            entry.clear();
        }
        for id in plan_ids {
            if !entry.contains(id) {
                entry.push(id.clone());
            }
        }
        Ok(())
    }

    async fn rem_account_action_plans(
        &self,
        account_id: &str,
        plan_ids: Option<&[String]>,
    ) -> AppResult<()> {
        let mut index = self.account_action_plans.write();
        match plan_ids {
            None => {
                index.remove(account_id);
            }
            Some(ids) => {
                if let Some(entry) = index.get_mut(account_id) {
                    entry.retain(|id| !ids.contains(id));
                    if entry.is_empty() {
                        index.remove(account_id);
                    }
                }
            }
        }
        Ok(())
    }
}
