//! Action plan model
//!
//! An action plan is a named schedule of action lists shared by a set of
//! accounts. Membership is tracked on both sides: the plan lists account
//! ids and each account has an index of the plans it belongs to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One scheduled entry of a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionTiming {
    #[serde(rename = "Uuid")]
    pub uuid: String,
    /// Timing expression (e.g. `*asap`, `*monthly`)
    #[serde(default)]
    pub timing: String,
    #[serde(rename = "ActionsID")]
    pub actions_id: String,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionPlan {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "AccountIDs", default)]
    pub account_ids: BTreeSet<String>,
    #[serde(default)]
    pub action_timings: Vec<ActionTiming>,
}

impl ActionPlan {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Drop an account from the membership set, true if it was present
    pub fn remove_account(&mut self, account_id: &str) -> bool {
        self.account_ids.remove(account_id)
    }
}
