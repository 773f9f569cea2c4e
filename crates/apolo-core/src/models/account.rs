//! Account model
//!
//! An account owns its balances grouped by balance type, the counters fed
//! by debits and the threshold triggers evaluated against them. Action
//! handlers mutate balances through the entry points defined here.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::action::Action;
use super::action_trigger::{ActionTrigger, UnitCounter};
use super::balance::{balance_types, Balance, DEFAULT_BALANCE_ID};
use super::event::ThresholdEvent;
use crate::error::AppError;
use crate::AppResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    /// `tenant:account`
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub balance_map: BTreeMap<String, Vec<Balance>>,
    #[serde(default)]
    pub unit_counters: Vec<UnitCounter>,
    #[serde(default)]
    pub action_triggers: Vec<ActionTrigger>,
    #[serde(default)]
    pub allow_negative: bool,
    #[serde(default)]
    pub disabled: bool,
}

/// Compose the storage id of an account
pub fn account_key(tenant: &str, account: &str) -> String {
    format!("{tenant}:{account}")
}

impl Account {
    pub fn new(tenant: &str, account: &str) -> Self {
        Self {
            id: account_key(tenant, account),
            ..Default::default()
        }
    }

    /// Split the id into `(tenant, account)`
    pub fn tenant_account(&self) -> (&str, &str) {
        self.id.split_once(':').unwrap_or(("", self.id.as_str()))
    }

    pub fn balances(&self, balance_type: &str) -> &[Balance] {
        self.balance_map
            .get(balance_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum of the non-expired balances of a type
    pub fn total_value(&self, balance_type: &str) -> f64 {
        let now = Utc::now();
        self.balances(balance_type)
            .iter()
            .filter(|b| !b.is_expired(now))
            .map(|b| b.value)
            .sum()
    }

    /// Subtract the action's balance value from every matching balance.
    ///
    /// `reset` zeroes each matched balance first, `reset_if_negative` only
    /// when its value is below zero. When nothing matches a new balance is
    /// appended carrying `-value`. The total amount subtracted is recorded
    /// on the action: positive when debited, negative when credited.
    pub fn debit_balance_action(
        &mut self,
        action: &mut Action,
        reset: bool,
        reset_if_negative: bool,
    ) -> AppResult<()> {
        let filter = action
            .balance
            .as_ref()
            .ok_or_else(|| AppError::InvalidInput(format!("action {} has no balance", action.id)))?;
        let balance_type = filter.balance_type();
        if balance_type.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "action {} has no balance type",
                action.id
            )));
        }
        let amount = filter.value();
        let now = Utc::now();

        let bucket = self.balance_map.entry(balance_type.to_string()).or_default();
        let mut applied = 0.0;
        let mut found = false;
        for balance in bucket.iter_mut() {
            if balance.is_expired(now) || !balance.match_filter(Some(filter), false, false) {
                continue;
            }
            found = true;
            if reset || (reset_if_negative && balance.value < 0.0) {
                balance.value = 0.0;
            }
            balance.value -= amount;
            applied += amount;
        }

        if !found {
            let mut created = if filter.id() == DEFAULT_BALANCE_ID {
                Balance {
                    id: DEFAULT_BALANCE_ID.to_string(),
                    ..Default::default()
                }
            } else {
                filter.create_balance()
            };
            created.value = -amount;
            if created.uuid.is_empty() {
                created.uuid = Uuid::new_v4().to_string();
            }
            bucket.push(created);
            applied = amount;
        }

        action.balance_value = applied;
        self.init_counters();
        Ok(())
    }

    /// Create or update the balance addressed by the action's UUID or ID
    pub fn set_balance_action(&mut self, action: &Action) -> AppResult<()> {
        let filter = action
            .balance
            .as_ref()
            .ok_or_else(|| AppError::InvalidInput(format!("action {} has no balance", action.id)))?;
        let now = Utc::now();
        let bucket = self
            .balance_map
            .entry(filter.balance_type().to_string())
            .or_default();

        let existing = bucket.iter_mut().find(|b| {
            !b.is_expired(now)
                && ((filter.uuid.is_some() && b.uuid == filter.uuid())
                    || (filter.id.is_some() && b.id == filter.id()))
        });
        match existing {
            Some(balance) => filter.modify_balance(balance),
            None => {
                let mut balance = Balance::new(0.0);
                filter.modify_balance(&mut balance);
                bucket.push(balance);
            }
        }
        Ok(())
    }

    /// Mark matching triggers as not executed; `None` selects all
    pub fn reset_action_triggers(&mut self, action: Option<&Action>) {
        for trigger in self
            .action_triggers
            .iter_mut()
            .filter(|t| t.matches(action))
        {
            trigger.executed = false;
        }
    }

    pub fn set_recurrent(&mut self, action: &Action, recurrent: bool) {
        for trigger in self
            .action_triggers
            .iter_mut()
            .filter(|t| t.matches(Some(action)))
        {
            trigger.recurrent = recurrent;
        }
    }

    /// Rebuild the unit counters from the counter triggers, keeping the
    /// running value of counters that survive
    pub fn init_counters(&mut self) {
        let previous = std::mem::take(&mut self.unit_counters);
        let mut counters: Vec<UnitCounter> = Vec::new();
        for trigger in self.action_triggers.iter().filter(|t| t.is_counter()) {
            let mut counter = UnitCounter::for_trigger(trigger);
            if counters.iter().any(|c| c.same_slot(&counter)) {
                continue;
            }
            if let Some(old) = previous.iter().find(|c| c.same_slot(&counter)) {
                counter.value = old.value;
            }
            counters.push(counter);
        }
        self.unit_counters = counters;
    }

    /// Zero the counters of the action's balance type; all when untyped
    pub fn reset_counters(&mut self, action: Option<&Action>) {
        let balance_type = action
            .and_then(|a| a.balance.as_ref())
            .and_then(|b| b.balance_type.clone());
        for counter in self.unit_counters.iter_mut() {
            if balance_type
                .as_deref()
                .map_or(true, |bt| bt == counter.balance_type)
            {
                counter.value = 0.0;
            }
        }
    }

    /// Position of the `*default` monetary balance, created when missing
    pub fn default_money_balance_index(&mut self) -> usize {
        let bucket = self
            .balance_map
            .entry(balance_types::MONETARY.to_string())
            .or_default();
        if let Some(idx) = bucket.iter().position(Balance::is_default) {
            return idx;
        }
        let mut balance = Balance::new(0.0);
        balance.id = DEFAULT_BALANCE_ID.to_string();
        bucket.push(balance);
        bucket.len() - 1
    }

    /// Threshold event describing the account flags
    pub fn as_event(&self) -> ThresholdEvent {
        let (tenant, account) = self.tenant_account();
        let mut event = BTreeMap::new();
        event.insert("EventType".to_string(), json!("AccountUpdate"));
        event.insert("Account".to_string(), json!(account));
        event.insert("AllowNegative".to_string(), json!(self.allow_negative));
        event.insert("Disabled".to_string(), json!(self.disabled));
        ThresholdEvent::new(tenant, event)
    }
}
