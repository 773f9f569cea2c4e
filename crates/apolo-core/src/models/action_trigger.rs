//! Action triggers and unit counters

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::balance::BalanceFilter;

/// Counter type tags
pub const EVENT_COUNTER: &str = "*event";
pub const BALANCE_COUNTER: &str = "*balance";

/// Threshold rule attached to an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ActionTrigger {
    /// Group id shared by triggers loaded together
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "UniqueID")]
    pub unique_id: String,
    /// e.g. `*min_balance`, `*max_event_counter`
    pub threshold_type: String,
    pub threshold_value: f64,
    pub recurrent: bool,
    pub balance: Option<BalanceFilter>,
    pub weight: f64,
    #[serde(rename = "ActionsID")]
    pub actions_id: String,
    pub executed: bool,
}

/// Trigger selectors an action may carry in its extra parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TriggerSelector {
    #[serde(rename = "GroupID")]
    group_id: String,
    #[serde(rename = "UniqueID")]
    unique_id: String,
    threshold_type: String,
}

impl ActionTrigger {
    fn balance_type(&self) -> &str {
        self.balance.as_ref().map_or("", BalanceFilter::balance_type)
    }

    pub fn is_counter(&self) -> bool {
        self.threshold_type.ends_with("_counter")
    }

    /// Whether `action` addresses this trigger.
    ///
    /// No action selects every trigger. A balance type on the action must
    /// equal the trigger's, and the optional JSON selector in the action's
    /// extra parameters narrows by group, unique id and threshold type.
    pub fn matches(&self, action: Option<&Action>) -> bool {
        let Some(action) = action else {
            return true;
        };

        if let Some(filter) = &action.balance {
            if filter.balance_type.is_some() && filter.balance_type() != self.balance_type() {
                return false;
            }
        }

        if action.extra_parameters.is_empty() {
            return true;
        }
        let Ok(selector) = serde_json::from_str::<TriggerSelector>(&action.extra_parameters) else {
            return false;
        };
        (selector.group_id.is_empty() || selector.group_id == self.id)
            && (selector.unique_id.is_empty() || selector.unique_id == self.unique_id)
            && (selector.threshold_type.is_empty() || selector.threshold_type == self.threshold_type)
    }
}

/// Running counter fed by debits, derived from the counter triggers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UnitCounter {
    pub counter_type: String,
    pub balance_type: String,
    pub value: f64,
    pub filter: Option<BalanceFilter>,
}

impl UnitCounter {
    pub(crate) fn same_slot(&self, other: &UnitCounter) -> bool {
        self.counter_type == other.counter_type
            && self.balance_type == other.balance_type
            && self.filter == other.filter
    }

    pub(crate) fn for_trigger(trigger: &ActionTrigger) -> Self {
        let counter_type = if trigger.threshold_type.contains("event") {
            EVENT_COUNTER
        } else {
            BALANCE_COUNTER
        };
        Self {
            counter_type: counter_type.to_string(),
            balance_type: trigger.balance_type().to_string(),
            value: 0.0,
            filter: trigger.balance.clone(),
        }
    }
}
