//! Action list execution
//!
//! Sorts the list by descending weight and runs each action's handler in
//! turn. The first failing action aborts the rest of the list; whatever the
//! earlier actions changed stays changed.

use apolo_core::models::{account_key, Account, ActionType, Actions, StatsQueueTriggered};
use apolo_core::traits::NON_TRANSACTIONAL;
use apolo_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::context::EngineContext;
use crate::registry::ActionRegistry;

/// Result of running a list against a stored account
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// The account after execution; `None` when the list removed it
    pub account: Option<Account>,
    /// The executed list in execution order, with recorded results
    pub actions: Actions,
}

#[derive(Clone)]
pub struct ActionExecutor {
    registry: ActionRegistry,
    ctx: Arc<EngineContext>,
}

impl ActionExecutor {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self::with_registry(ctx, ActionRegistry::new())
    }

    pub fn with_registry(ctx: Arc<EngineContext>, registry: ActionRegistry) -> Self {
        Self { registry, ctx }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Run `actions` against `account` and/or the triggering queue `sq`.
    ///
    /// The list is sorted in place. Results recorded by handlers are
    /// written back into it, including those of a failing action.
    #[instrument(skip_all, fields(account = account.as_ref().map(|a| a.id.as_str()).unwrap_or("")))]
    pub async fn execute(
        &self,
        mut account: Option<&mut Account>,
        sq: Option<&StatsQueueTriggered>,
        actions: &mut Actions,
    ) -> AppResult<()> {
        actions.sort();
        for idx in 0..actions.len() {
            let tag = actions[idx].action_type.clone();
            let handler = self.registry.resolve(&tag).ok_or_else(|| {
                error!(action = %actions[idx].id, action_type = %tag, "Unsupported action type");
                AppError::UnsupportedAction(tag.clone())
            })?;

            let mut action = actions[idx].clone();
            debug!(action = %action.id, action_type = %tag, weight = action.weight, "Executing action");
            let result = handler
                .execute(&self.ctx, account.as_deref_mut(), sq, &mut action, actions)
                .await;
            actions[idx] = action;

            if let Err(e) = result {
                error!(action = %actions[idx].id, action_type = %tag, error = %e, "Action failed");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Load an account, run `actions` against it and persist the result.
    ///
    /// The account is not written back when the list removed it. On failure
    /// the partial effects are persisted before the error is returned.
    #[instrument(skip(self, actions))]
    pub async fn execute_for_account(
        &self,
        tenant: &str,
        account: &str,
        mut actions: Actions,
    ) -> AppResult<ExecutionOutcome> {
        let account_id = account_key(tenant, account);
        let mut acc = self.ctx.data_store.get_account(&account_id).await?;

        let result = self.execute(Some(&mut acc), None, &mut actions).await;
        let removed = actions.contains_type(ActionType::RemoveAccount)
            && self.ctx.data_store.get_account(&account_id).await.is_err();
        if !removed {
            self.ctx.data_store.set_account(&acc).await?;
        }
        result?;

        info!(account = %account_id, actions = actions.len(), "Actions executed");
        Ok(ExecutionOutcome {
            account: (!removed).then_some(acc),
            actions,
        })
    }

    /// Run a stored action list against a stored account
    pub async fn execute_stored(
        &self,
        tenant: &str,
        account: &str,
        actions_id: &str,
    ) -> AppResult<ExecutionOutcome> {
        let actions = self
            .ctx
            .data_store
            .get_actions(actions_id, false, NON_TRANSACTIONAL)
            .await?;
        self.execute_for_account(tenant, account, actions).await
    }
}
