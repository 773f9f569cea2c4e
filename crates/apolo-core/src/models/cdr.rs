//! CDR (Call Detail Record) model
//!
//! Records synthesized by `*cdrlog` for balance mutations. Fields can be
//! written by name through [`Cdr::set_field`]; names without a matching
//! field land in the extra-fields bag.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cdr {
    #[serde(rename = "CGRID")]
    pub cgrid: String,
    #[serde(rename = "RunID")]
    pub run_id: String,
    #[serde(default)]
    pub order_id: i64,
    pub origin_host: String,
    pub source: String,
    #[serde(rename = "OriginID")]
    pub origin_id: String,
    #[serde(rename = "ToR")]
    pub tor: String,
    pub request_type: String,
    pub tenant: String,
    pub category: String,
    pub account: String,
    pub subject: String,
    pub destination: String,
    pub setup_time: DateTime<Utc>,
    pub answer_time: DateTime<Utc>,
    /// Nanoseconds
    pub usage: i64,
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub extra_info: String,
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub pre_rated: bool,
    #[serde(default)]
    pub cost_source: String,
    pub cost: f64,
}

/// How a named CDR field accepts a resolved text value
#[derive(Clone, Copy)]
enum FieldSetter {
    Text(fn(&mut Cdr, String)),
    Number(fn(&mut Cdr, f64)),
    /// Typed fields that cannot be set from text
    Fixed,
}

static FIELD_SETTERS: Lazy<HashMap<&'static str, FieldSetter>> = Lazy::new(|| {
    use FieldSetter::*;
    let mut m: HashMap<&'static str, FieldSetter> = HashMap::new();
    m.insert("CGRID", Text(|c, v| c.cgrid = v));
    m.insert("RunID", Text(|c, v| c.run_id = v));
    m.insert("OriginHost", Text(|c, v| c.origin_host = v));
    m.insert("Source", Text(|c, v| c.source = v));
    m.insert("OriginID", Text(|c, v| c.origin_id = v));
    m.insert("ToR", Text(|c, v| c.tor = v));
    m.insert("RequestType", Text(|c, v| c.request_type = v));
    m.insert("Tenant", Text(|c, v| c.tenant = v));
    m.insert("Category", Text(|c, v| c.category = v));
    m.insert("Account", Text(|c, v| c.account = v));
    m.insert("Subject", Text(|c, v| c.subject = v));
    m.insert("Destination", Text(|c, v| c.destination = v));
    m.insert("ExtraInfo", Text(|c, v| c.extra_info = v));
    m.insert("CostSource", Text(|c, v| c.cost_source = v));
    m.insert("Cost", Number(|c, v| c.cost = v));
    for fixed in [
        "OrderID",
        "SetupTime",
        "AnswerTime",
        "Usage",
        "ExtraFields",
        "Partial",
        "PreRated",
    ] {
        m.insert(fixed, Fixed);
    }
    m
});

impl Cdr {
    /// Write a resolved value into the field called `name`.
    ///
    /// Numeric fields that fail to parse are skipped. Unknown names go to
    /// `extra_fields`.
    pub fn set_field(&mut self, name: &str, value: String) {
        match FIELD_SETTERS.get(name) {
            Some(FieldSetter::Text(set)) => set(self, value),
            Some(FieldSetter::Number(set)) => match value.parse::<f64>() {
                Ok(number) => set(self, number),
                Err(e) => debug!(field = name, value = %value, error = %e, "Skipping unparsable CDR field"),
            },
            Some(FieldSetter::Fixed) => {
                debug!(field = name, "CDR field is not settable from text")
            }
            None => {
                self.extra_fields.insert(name.to_string(), value);
            }
        }
    }
}
