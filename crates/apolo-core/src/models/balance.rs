//! Balance model
//!
//! A balance is a typed unit of credit inside an account. Balances are
//! grouped per type (`*monetary`, `*voice`, ...) in the account's balance map
//! and selected through a [`BalanceFilter`] whose attributes are all optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::event::ThresholdEvent;

/// Ordered set of string tags (destination ids, categories, ...)
pub type StringSet = BTreeSet<String>;

/// Balance type tags
pub mod balance_types {
    pub const MONETARY: &str = "*monetary";
    pub const VOICE: &str = "*voice";
    pub const SMS: &str = "*sms";
    pub const DATA: &str = "*data";
    pub const GENERIC: &str = "*generic";
}

/// ID reserved for the account's default monetary balance
pub const DEFAULT_BALANCE_ID: &str = "*default";

/// A single balance within an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Balance {
    pub uuid: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub value: f64,
    pub directions: StringSet,
    /// `None` never expires
    pub expiration_date: Option<DateTime<Utc>>,
    pub weight: f64,
    #[serde(rename = "DestinationIDs")]
    pub destination_ids: StringSet,
    pub rating_subject: String,
    pub categories: StringSet,
    pub shared_groups: StringSet,
    #[serde(rename = "TimingIDs")]
    pub timing_ids: StringSet,
    pub disabled: bool,
    pub blocker: bool,
}

impl Balance {
    /// Create a balance with a fresh UUID
    pub fn new(value: f64) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            value,
            ..Default::default()
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.map_or(false, |exp| exp <= now)
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_BALANCE_ID
    }

    /// Check the balance against a filter.
    ///
    /// A non-empty UUID or ID in the filter decides the match on its own
    /// unless `skip_ids` is set. Otherwise every attribute present in the
    /// filter must match; set attributes match when the balance's set
    /// contains all of the filter's members.
    pub fn match_filter(
        &self,
        filter: Option<&BalanceFilter>,
        skip_ids: bool,
        skip_expiry: bool,
    ) -> bool {
        let Some(f) = filter else {
            return true;
        };

        if !skip_ids {
            if let Some(uuid) = f.uuid.as_deref().filter(|u| !u.is_empty()) {
                return self.uuid == uuid;
            }
            if let Some(id) = f.id.as_deref().filter(|i| !i.is_empty()) {
                return self.id == id;
            }
        }

        if !skip_expiry && f.expiration_date.is_some() && f.expiration_date != self.expiration_date
        {
            return false;
        }
        if f.weight.map_or(false, |w| w != self.weight) {
            return false;
        }
        if f.blocker.map_or(false, |b| b != self.blocker) {
            return false;
        }
        if f.disabled.map_or(false, |d| d != self.disabled) {
            return false;
        }
        if f
            .rating_subject
            .as_deref()
            .map_or(false, |rs| rs != self.rating_subject)
        {
            return false;
        }

        includes(&self.destination_ids, f.destination_ids.as_ref())
            && includes(&self.directions, f.directions.as_ref())
            && includes(&self.categories, f.categories.as_ref())
            && includes(&self.shared_groups, f.shared_groups.as_ref())
            && includes(&self.timing_ids, f.timing_ids.as_ref())
    }

    /// Threshold event describing this balance
    pub fn as_event(&self, account_id: &str, balance_type: &str) -> ThresholdEvent {
        let (tenant, account) = account_id.split_once(':').unwrap_or(("", account_id));
        let mut event = BTreeMap::new();
        event.insert("EventType".to_string(), json!("BalanceUpdate"));
        event.insert("Account".to_string(), json!(account));
        event.insert("BalanceID".to_string(), json!(self.id));
        event.insert("BalanceUUID".to_string(), json!(self.uuid));
        event.insert("BalanceType".to_string(), json!(balance_type));
        event.insert("Units".to_string(), json!(self.value));
        if let Some(exp) = self.expiration_date {
            event.insert("ExpiryTime".to_string(), json!(exp.to_rfc3339()));
        }
        ThresholdEvent::new(tenant, event)
    }
}

fn includes(have: &StringSet, wanted: Option<&StringSet>) -> bool {
    wanted.map_or(true, |w| w.is_subset(have))
}

/// Selection and update template for balances.
///
/// Every attribute is optional: `None` means "not constrained" when
/// matching and "leave untouched" when modifying. For the boolean flags an
/// explicit `Some(false)` is observably different from `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BalanceFilter {
    pub uuid: Option<String>,
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "Type")]
    pub balance_type: Option<String>,
    pub value: Option<f64>,
    pub directions: Option<StringSet>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub weight: Option<f64>,
    #[serde(rename = "DestinationIDs")]
    pub destination_ids: Option<StringSet>,
    pub rating_subject: Option<String>,
    pub categories: Option<StringSet>,
    pub shared_groups: Option<StringSet>,
    #[serde(rename = "TimingIDs")]
    pub timing_ids: Option<StringSet>,
    pub disabled: Option<bool>,
    pub blocker: Option<bool>,
}

impl BalanceFilter {
    /// Filter selecting a balance type with an amount
    pub fn of_type(balance_type: &str, value: f64) -> Self {
        Self {
            balance_type: Some(balance_type.to_string()),
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn balance_type(&self) -> &str {
        self.balance_type.as_deref().unwrap_or("")
    }

    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = Some(value);
    }

    pub fn uuid(&self) -> &str {
        self.uuid.as_deref().unwrap_or("")
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    pub fn rating_subject(&self) -> &str {
        self.rating_subject.as_deref().unwrap_or("")
    }

    /// Build a balance carrying every attribute of the filter
    pub fn create_balance(&self) -> Balance {
        Balance {
            uuid: self.uuid().to_string(),
            id: self.id().to_string(),
            value: self.value(),
            directions: self.directions.clone().unwrap_or_default(),
            expiration_date: self.expiration_date,
            weight: self.weight.unwrap_or(0.0),
            destination_ids: self.destination_ids.clone().unwrap_or_default(),
            rating_subject: self.rating_subject().to_string(),
            categories: self.categories.clone().unwrap_or_default(),
            shared_groups: self.shared_groups.clone().unwrap_or_default(),
            timing_ids: self.timing_ids.clone().unwrap_or_default(),
            disabled: self.disabled.unwrap_or(false),
            blocker: self.blocker.unwrap_or(false),
        }
    }

    /// Overwrite the attributes of `balance` that are present in the filter
    pub fn modify_balance(&self, balance: &mut Balance) {
        if let Some(id) = &self.id {
            balance.id = id.clone();
        }
        if let Some(value) = self.value {
            balance.value = value;
        }
        if let Some(directions) = &self.directions {
            balance.directions = directions.clone();
        }
        if let Some(exp) = self.expiration_date {
            balance.expiration_date = Some(exp);
        }
        if let Some(weight) = self.weight {
            balance.weight = weight;
        }
        if let Some(dst) = &self.destination_ids {
            balance.destination_ids = dst.clone();
        }
        if let Some(rs) = &self.rating_subject {
            balance.rating_subject = rs.clone();
        }
        if let Some(categories) = &self.categories {
            balance.categories = categories.clone();
        }
        if let Some(sg) = &self.shared_groups {
            balance.shared_groups = sg.clone();
        }
        if let Some(timings) = &self.timing_ids {
            balance.timing_ids = timings.clone();
        }
        if let Some(disabled) = self.disabled {
            balance.disabled = disabled;
        }
        if let Some(blocker) = self.blocker {
            balance.blocker = blocker;
        }
    }
}

/// Join a string set with `;`, the list separator used in CDR fields
pub fn join_set(set: Option<&StringSet>) -> String {
    set.map(|s| s.iter().cloned().collect::<Vec<_>>().join(";"))
        .unwrap_or_default()
}
