//! Triggering statistics queue
//!
//! Snapshot of a statistics queue whose threshold fired; it can drive an
//! action list in place of an account event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::action_trigger::ActionTrigger;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatsQueueTriggered {
    #[serde(rename = "Id")]
    pub id: String,
    /// Metric name to computed value
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub trigger: Option<ActionTrigger>,
}
