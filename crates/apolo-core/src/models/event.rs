//! Threshold events
//!
//! Change notifications emitted for threshold subscribers when an account
//! or one of its balances is published.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ThresholdEvent {
    pub tenant: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub event: BTreeMap<String, Value>,
}

impl ThresholdEvent {
    pub fn new(tenant: &str, event: BTreeMap<String, Value>) -> Self {
        Self {
            tenant: tenant.to_string(),
            id: Uuid::new_v4().to_string(),
            event,
        }
    }

    /// Value of the `EventType` field, empty when missing
    pub fn event_type(&self) -> &str {
        self.event
            .get("EventType")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}
