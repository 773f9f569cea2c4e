//! `*remove_account`
//!
//! Deletes the account, then, under the action-plan lock, detaches it from
//! every action plan that referenced it and drops its plan index. Cached
//! copies of the touched plans and of the index are refreshed.

use apolo_cache::keys::{ACCOUNT_ACTION_PLANS_PREFIX, ACTION_PLAN_PREFIX};
use apolo_core::models::{account_key, Account, Action, Actions, StatsQueueTriggered};
use apolo_core::traits::NON_TRANSACTIONAL;
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::context::EngineContext;
use crate::registry::ActionHandler;

/// Account address carried in the extra parameters when no account is bound
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AccountParams {
    tenant: String,
    account: String,
}

fn account_id_from_params(extra_parameters: &str) -> AppResult<String> {
    let params: AccountParams = serde_json::from_str(extra_parameters)
        .map_err(|e| AppError::Parser(format!("invalid account parameters: {}", e)))?;
    if params.tenant.is_empty() || params.account.is_empty() {
        return Err(AppError::InvalidKey(format!(
            "{}:{}",
            params.tenant, params.account
        )));
    }
    Ok(account_key(&params.tenant, &params.account))
}

pub struct RemoveAccount;

#[async_trait]
impl ActionHandler for RemoveAccount {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let account_id = match account.as_deref() {
            Some(acc) => acc.id.clone(),
            None => account_id_from_params(&action.extra_parameters)?,
        };

        if let Err(e) = ctx.data_store.remove_account(&account_id).await {
            error!(account = %account_id, error = %e, "Could not remove account");
            return Err(e);
        }

        let account_id = account_id.as_str();
        ctx.guardian
            .guard(
                ACTION_PLAN_PREFIX,
                ctx.general.locking_timeout(),
                move || async move { detach_from_plans(ctx, account_id).await },
            )
            .await?;

        info!(account = %account_id, "Account removed");
        Ok(())
    }
}

async fn detach_from_plans(ctx: &EngineContext, account_id: &str) -> AppResult<()> {
    let plan_ids = match ctx
        .data_store
        .get_account_action_plans(account_id, false, NON_TRANSACTIONAL)
        .await
    {
        Ok(ids) => ids,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };

    for plan_id in &plan_ids {
        let mut plan = ctx
            .data_store
            .get_action_plan(plan_id, true, NON_TRANSACTIONAL)
            .await
            .map_err(|e| {
                error!(plan = %plan_id, error = %e, "Could not load action plan");
                e
            })?;
        plan.remove_account(account_id);
        ctx.data_store
            .set_action_plan(plan_id, &plan, true, NON_TRANSACTIONAL)
            .await?;
        debug!(plan = %plan_id, account = account_id, "Account detached from action plan");
    }

    if !plan_ids.is_empty() {
        ctx.cache.reload(ACTION_PLAN_PREFIX, &plan_ids, true).await?;
    }

    ctx.data_store
        .rem_account_action_plans(account_id, None)
        .await?;
    match ctx
        .cache
        .reload(ACCOUNT_ACTION_PLANS_PREFIX, &[account_id.to_string()], true)
        .await
    {
        Err(e) if !e.is_not_found() => Err(e),
        _ => Ok(()),
    }
}
