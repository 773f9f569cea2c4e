//! Action type to handler dispatch

use apolo_core::models::{Account, Action, ActionType, Actions, StatsQueueTriggered};
use apolo_core::AppResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::EngineContext;
use crate::handlers::{
    account_removal::RemoveAccount,
    balance::{
        Debit, RemoveBalance, SetBalance, SetExpiry, TopUp, TopUpZeroNegative,
        TransferMonetaryDefault,
    },
    cdrlog::CdrLog,
    destinations::SetDdestinations,
    lifecycle::{ResetAccount, ResetCounters, ResetTriggers, SetAllowNegative, SetDisabled, SetRecurrent},
    notify::{CallUrl, LogAction, MailAsync, PublishAccount},
    rpc::CgrRpc,
};

/// One action type's behavior.
///
/// `account` is the account the list runs against (absent for queue
/// triggered lists), `siblings` is the whole list being executed.
/// Handlers may record results on `action` (`balance_value`,
/// `expiration_string`); the executor writes it back into the list.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        siblings: &Actions,
    ) -> AppResult<()>;
}

/// Static table of handlers, one per supported type tag
#[derive(Clone)]
pub struct ActionRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        let mut handlers: HashMap<ActionType, Arc<dyn ActionHandler>> = HashMap::new();
        handlers.insert(ActionType::Log, Arc::new(LogAction));
        handlers.insert(ActionType::CdrLog, Arc::new(CdrLog));
        handlers.insert(ActionType::ResetTriggers, Arc::new(ResetTriggers));
        handlers.insert(ActionType::SetRecurrent, Arc::new(SetRecurrent(true)));
        handlers.insert(ActionType::UnsetRecurrent, Arc::new(SetRecurrent(false)));
        handlers.insert(ActionType::AllowNegative, Arc::new(SetAllowNegative(true)));
        handlers.insert(ActionType::DenyNegative, Arc::new(SetAllowNegative(false)));
        handlers.insert(ActionType::ResetAccount, Arc::new(ResetAccount));
        handlers.insert(ActionType::TopUpReset, Arc::new(TopUp { reset: true }));
        handlers.insert(ActionType::TopUp, Arc::new(TopUp { reset: false }));
        handlers.insert(ActionType::DebitReset, Arc::new(Debit { reset: true }));
        handlers.insert(ActionType::Debit, Arc::new(Debit { reset: false }));
        handlers.insert(ActionType::ResetCounters, Arc::new(ResetCounters));
        handlers.insert(ActionType::EnableAccount, Arc::new(SetDisabled(false)));
        handlers.insert(ActionType::DisableAccount, Arc::new(SetDisabled(true)));
        handlers.insert(ActionType::CallUrl, Arc::new(CallUrl { detached: false }));
        handlers.insert(ActionType::CallUrlAsync, Arc::new(CallUrl { detached: true }));
        handlers.insert(ActionType::MailAsync, Arc::new(MailAsync));
        handlers.insert(ActionType::SetDdestinations, Arc::new(SetDdestinations));
        handlers.insert(ActionType::RemoveAccount, Arc::new(RemoveAccount));
        handlers.insert(ActionType::RemoveBalance, Arc::new(RemoveBalance));
        handlers.insert(ActionType::SetBalance, Arc::new(SetBalance));
        handlers.insert(ActionType::TransferMonetaryDefault, Arc::new(TransferMonetaryDefault));
        handlers.insert(ActionType::CgrRpc, Arc::new(CgrRpc));
        handlers.insert(ActionType::TopUpZeroNegative, Arc::new(TopUpZeroNegative));
        handlers.insert(ActionType::SetExpiry, Arc::new(SetExpiry));
        handlers.insert(ActionType::PublishAccount, Arc::new(PublishAccount));
        Self { handlers }
    }

    /// Handler for a type tag; `None` for unknown tags
    pub fn resolve(&self, tag: &str) -> Option<Arc<dyn ActionHandler>> {
        ActionType::from_tag(tag).and_then(|t| self.handlers.get(&t).cloned())
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_resolves() {
        let registry = ActionRegistry::new();
        for t in ActionType::ALL {
            assert!(registry.resolve(t.as_str()).is_some(), "{} unresolved", t);
        }
    }

    #[test]
    fn test_unknown_tags_do_not_resolve() {
        let registry = ActionRegistry::new();
        assert!(registry.resolve("*does_not_exist").is_none());
        assert!(registry.resolve("").is_none());
        assert!(registry.resolve("topup").is_none());
    }
}
