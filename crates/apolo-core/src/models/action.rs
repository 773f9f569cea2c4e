//! Action model
//!
//! An action is one instruction (type tag, parameters, weight) applied to
//! an account or on behalf of a triggering statistics queue. Action lists
//! execute in descending weight order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, DerefMut};

use super::balance::BalanceFilter;

/// Closed set of supported action type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Log,
    CdrLog,
    ResetTriggers,
    SetRecurrent,
    UnsetRecurrent,
    AllowNegative,
    DenyNegative,
    ResetAccount,
    TopUpReset,
    TopUp,
    DebitReset,
    Debit,
    ResetCounters,
    EnableAccount,
    DisableAccount,
    CallUrl,
    CallUrlAsync,
    MailAsync,
    SetDdestinations,
    RemoveAccount,
    RemoveBalance,
    SetBalance,
    TransferMonetaryDefault,
    CgrRpc,
    TopUpZeroNegative,
    SetExpiry,
    PublishAccount,
}

impl ActionType {
    pub const ALL: [ActionType; 27] = [
        ActionType::Log,
        ActionType::CdrLog,
        ActionType::ResetTriggers,
        ActionType::SetRecurrent,
        ActionType::UnsetRecurrent,
        ActionType::AllowNegative,
        ActionType::DenyNegative,
        ActionType::ResetAccount,
        ActionType::TopUpReset,
        ActionType::TopUp,
        ActionType::DebitReset,
        ActionType::Debit,
        ActionType::ResetCounters,
        ActionType::EnableAccount,
        ActionType::DisableAccount,
        ActionType::CallUrl,
        ActionType::CallUrlAsync,
        ActionType::MailAsync,
        ActionType::SetDdestinations,
        ActionType::RemoveAccount,
        ActionType::RemoveBalance,
        ActionType::SetBalance,
        ActionType::TransferMonetaryDefault,
        ActionType::CgrRpc,
        ActionType::TopUpZeroNegative,
        ActionType::SetExpiry,
        ActionType::PublishAccount,
    ];

    /// Wire tag of the action type
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Log => "*log",
            ActionType::CdrLog => "*cdrlog",
            ActionType::ResetTriggers => "*reset_triggers",
            ActionType::SetRecurrent => "*set_recurrent",
            ActionType::UnsetRecurrent => "*unset_recurrent",
            ActionType::AllowNegative => "*allow_negative",
            ActionType::DenyNegative => "*deny_negative",
            ActionType::ResetAccount => "*reset_account",
            ActionType::TopUpReset => "*topup_reset",
            ActionType::TopUp => "*topup",
            ActionType::DebitReset => "*debit_reset",
            ActionType::Debit => "*debit",
            ActionType::ResetCounters => "*reset_counters",
            ActionType::EnableAccount => "*enable_account",
            ActionType::DisableAccount => "*disable_account",
            ActionType::CallUrl => "*call_url",
            ActionType::CallUrlAsync => "*call_url_async",
            ActionType::MailAsync => "*mail_async",
            ActionType::SetDdestinations => "*set_ddestinations",
            ActionType::RemoveAccount => "*remove_account",
            ActionType::RemoveBalance => "*remove_balance",
            ActionType::SetBalance => "*set_balance",
            ActionType::TransferMonetaryDefault => "*transfer_monetary_default",
            ActionType::CgrRpc => "*cgr_rpc",
            ActionType::TopUpZeroNegative => "*topup_zero_negative",
            ActionType::SetExpiry => "*set_expiry",
            ActionType::PublishAccount => "*publish_account",
        }
    }

    /// Parse a wire tag, `None` for unknown tags
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == tag)
    }

    /// Balance-mutating types that produce a CDR under `*cdrlog`
    pub fn is_cdr_loggable(&self) -> bool {
        matches!(
            self,
            ActionType::Debit | ActionType::DebitReset | ActionType::TopUp | ActionType::TopUpReset
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single action record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Action {
    #[serde(rename = "Id")]
    pub id: String,
    /// Type tag; kept as text so unknown tags survive until dispatch
    pub action_type: String,
    /// Handler-specific parameters (JSON, CSV, template or URL)
    pub extra_parameters: String,
    pub filter: String,
    pub expiration_string: String,
    pub weight: f64,
    pub balance: Option<BalanceFilter>,
    /// Signed amount applied by the last balance mutation: positive when
    /// debited, negative when credited. Set once per execution.
    #[serde(skip)]
    pub balance_value: f64,
}

impl Action {
    pub fn new(id: impl Into<String>, action_type: ActionType) -> Self {
        Self {
            id: id.into(),
            action_type: action_type.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_balance(mut self, balance: BalanceFilter) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_extra_parameters(mut self, params: impl Into<String>) -> Self {
        self.extra_parameters = params.into();
        self
    }

    /// Parsed type tag
    pub fn kind(&self) -> Option<ActionType> {
        ActionType::from_tag(&self.action_type)
    }
}

/// Ordered list of actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actions(Vec<Action>);

impl Actions {
    pub fn new(actions: Vec<Action>) -> Self {
        Self(actions)
    }

    /// Sort by descending weight; equal weights keep their input order
    pub fn sort(&mut self) {
        self.0
            .sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    }

    pub fn into_inner(self) -> Vec<Action> {
        self.0
    }

    /// True if any action carries the given type
    pub fn contains_type(&self, action_type: ActionType) -> bool {
        self.0.iter().any(|a| a.kind() == Some(action_type))
    }
}

impl From<Vec<Action>> for Actions {
    fn from(actions: Vec<Action>) -> Self {
        Self(actions)
    }
}

impl Deref for Actions {
    type Target = Vec<Action>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Actions {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::balance::balance_types;

    #[test]
    fn test_tag_round_trip_for_every_type() {
        for t in ActionType::ALL {
            assert_eq!(ActionType::from_tag(t.as_str()), Some(t));
        }
        assert_eq!(ActionType::from_tag("*unknown"), None);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let mut actions = Actions::new(vec![
            Action::new("a", ActionType::Log).with_weight(10.0),
            Action::new("b", ActionType::Debit).with_weight(20.0),
            Action::new("c", ActionType::Log).with_weight(10.0),
            Action::new("d", ActionType::AllowNegative).with_weight(30.0),
            Action::new("e", ActionType::Log).with_weight(10.0),
        ]);
        actions.sort();

        let ids: Vec<&str> = actions.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "a", "c", "e"]);
        assert!(actions.windows(2).all(|w| w[0].weight >= w[1].weight));
    }

    #[test]
    fn test_clone_is_deep_and_keeps_flag_presence() {
        let original = Actions::new(vec![Action::new("a", ActionType::TopUp).with_balance(
            BalanceFilter {
                balance_type: Some(balance_types::MONETARY.to_string()),
                value: Some(5.0),
                disabled: Some(false),
                blocker: None,
                ..Default::default()
            },
        )]);

        let mut copy = original.clone();
        let filter = copy[0].balance.as_mut().unwrap();
        assert_eq!(filter.disabled, Some(false));
        assert_eq!(filter.blocker, None);

        filter.set_value(-5.0);
        filter.disabled = Some(true);
        copy[0].balance_value = 3.0;

        let untouched = original[0].balance.as_ref().unwrap();
        assert_eq!(untouched.value, Some(5.0));
        assert_eq!(untouched.disabled, Some(false));
        assert_eq!(original[0].balance_value, 0.0);
    }

    #[test]
    fn test_action_deserializes_wire_names() {
        let action: Action = serde_json::from_str(
            r#"{"Id":"TOPUP_10","ActionType":"*topup","Weight":10,"Balance":{"Type":"*monetary","Value":10}}"#,
        )
        .unwrap();
        assert_eq!(action.kind(), Some(ActionType::TopUp));
        assert_eq!(action.balance.unwrap().value(), 10.0);
    }
}
