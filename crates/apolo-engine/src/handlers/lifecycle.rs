//! Account flags, triggers and counters

use apolo_core::models::{Account, Action, Actions, Balance, StatsQueueTriggered};
use apolo_core::AppResult;
use async_trait::async_trait;

use super::require_account;
use crate::context::EngineContext;
use crate::registry::ActionHandler;

/// `*enable_account` / `*disable_account`
pub struct SetDisabled(pub bool);

#[async_trait]
impl ActionHandler for SetDisabled {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        _action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        require_account(account)?.disabled = self.0;
        Ok(())
    }
}

/// `*allow_negative` / `*deny_negative`
pub struct SetAllowNegative(pub bool);

#[async_trait]
impl ActionHandler for SetAllowNegative {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        _action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        require_account(account)?.allow_negative = self.0;
        Ok(())
    }
}

/// `*reset_account`: one zero balance per type, fresh counters, all
/// triggers re-armed
pub struct ResetAccount;

#[async_trait]
impl ActionHandler for ResetAccount {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        _action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let account = require_account(account)?;
        for bucket in account.balance_map.values_mut() {
            *bucket = vec![Balance::new(0.0)];
        }
        account.init_counters();
        account.reset_action_triggers(None);
        Ok(())
    }
}

/// `*reset_triggers`
pub struct ResetTriggers;

#[async_trait]
impl ActionHandler for ResetTriggers {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        require_account(account)?.reset_action_triggers(Some(action));
        Ok(())
    }
}

/// `*reset_counters`
pub struct ResetCounters;

#[async_trait]
impl ActionHandler for ResetCounters {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        require_account(account)?.reset_counters(Some(action));
        Ok(())
    }
}

/// `*set_recurrent` / `*unset_recurrent`
pub struct SetRecurrent(pub bool);

#[async_trait]
impl ActionHandler for SetRecurrent {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        require_account(account)?.set_recurrent(action, self.0);
        Ok(())
    }
}
