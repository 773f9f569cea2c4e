//! Field expressions
//!
//! An RSR field names a source value and optionally rewrites it:
//!
//! - `^text` is a static value
//! - `~Name:s/regex/replacement/` resolves `Name` then applies each rule
//! - `Name` resolves the symbolic field as-is
//!
//! Several fields separated by `;` concatenate their results. Symbolic
//! names resolve against the acting account and action; unknown names
//! resolve to an empty string.

use apolo_core::models::{join_set, Account, Action};
use apolo_core::{AppError, AppResult};
use regex::Regex;

pub const STATIC_VALUE_PREFIX: char = '^';
pub const REGEXP_PREFIX: char = '~';
pub const FIELDS_SEP: char = ';';

/// One `s/regex/replacement/` rule
#[derive(Debug, Clone)]
pub struct ReplaceRule {
    pattern: Regex,
    replacement: String,
}

#[derive(Debug, Clone)]
pub struct RsrField {
    pub id: String,
    static_value: Option<String>,
    rules: Vec<ReplaceRule>,
}

impl RsrField {
    pub fn parse(expr: &str) -> AppResult<Self> {
        let expr = expr.trim();
        if let Some(value) = expr.strip_prefix(STATIC_VALUE_PREFIX) {
            return Ok(Self {
                id: expr.to_string(),
                static_value: Some(value.to_string()),
                rules: Vec::new(),
            });
        }

        let Some(body) = expr.strip_prefix(REGEXP_PREFIX) else {
            return Ok(Self {
                id: expr.to_string(),
                static_value: None,
                rules: Vec::new(),
            });
        };

        let (id, rules) = body
            .split_once(':')
            .ok_or_else(|| AppError::Parser(format!("invalid field expression: {}", expr)))?;
        let rules = rules
            .split(":s/")
            .map(|chunk| parse_rule(chunk, expr))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self {
            id: id.to_string(),
            static_value: None,
            rules,
        })
    }

    pub fn is_static(&self) -> bool {
        self.static_value.is_some()
    }

    /// Apply the field to a resolved source value
    pub fn apply(&self, value: &str) -> String {
        if let Some(fixed) = &self.static_value {
            return fixed.clone();
        }
        self.rules.iter().fold(value.to_string(), |acc, rule| {
            rule.pattern
                .replace_all(&acc, rule.replacement.as_str())
                .into_owned()
        })
    }
}

fn parse_rule(chunk: &str, expr: &str) -> AppResult<ReplaceRule> {
    let invalid = || AppError::Parser(format!("invalid replace rule in {}", expr));
    let chunk = chunk.strip_prefix("s/").unwrap_or(chunk);
    let chunk = chunk.strip_suffix('/').ok_or_else(invalid)?;
    let (pattern, replacement) = chunk.split_once('/').ok_or_else(invalid)?;
    let pattern = Regex::new(pattern)
        .map_err(|e| AppError::Parser(format!("invalid regex in {}: {}", expr, e)))?;
    Ok(ReplaceRule {
        pattern,
        replacement: replacement.to_string(),
    })
}

/// Parse a separated list of fields, skipping empty entries
pub fn parse_rsr_fields(expr: &str, sep: char) -> AppResult<Vec<RsrField>> {
    expr.split(sep)
        .filter(|part| !part.trim().is_empty())
        .map(RsrField::parse)
        .collect()
}

/// Value of a symbolic field for an account/action pair
pub fn symbolic_value(name: &str, account: Option<&Account>, action: &Action) -> String {
    let filter = action.balance.as_ref();
    match name {
        "AccountID" => account.map(|a| a.id.clone()).unwrap_or_default(),
        "Directions" => join_set(filter.and_then(|b| b.directions.as_ref())),
        "Tenant" => account
            .map(|a| a.tenant_account().0.to_string())
            .unwrap_or_default(),
        "Account" => account
            .map(|a| a.tenant_account().1.to_string())
            .unwrap_or_default(),
        "ActionID" => action.id.clone(),
        "ActionType" => action.action_type.clone(),
        "ActionValue" => format_float(filter.map_or(0.0, |b| b.value())),
        "BalanceType" => filter.map(|b| b.balance_type().to_string()).unwrap_or_default(),
        "BalanceUUID" => filter.map(|b| b.uuid().to_string()).unwrap_or_default(),
        "BalanceID" => filter.map(|b| b.id().to_string()).unwrap_or_default(),
        "BalanceValue" => format_float(action.balance_value),
        "DestinationIDs" => join_set(filter.and_then(|b| b.destination_ids.as_ref())),
        "ExtraParameters" => action.extra_parameters.clone(),
        "RatingSubject" => filter.map(|b| b.rating_subject().to_string()).unwrap_or_default(),
        "Category" => join_set(filter.and_then(|b| b.categories.as_ref())),
        "SharedGroups" => join_set(filter.and_then(|b| b.shared_groups.as_ref())),
        _ => String::new(),
    }
}

/// Concatenate the values of `fields` for an account/action pair
pub fn parse_template_value(fields: &[RsrField], account: Option<&Account>, action: &Action) -> String {
    fields
        .iter()
        .map(|field| {
            if field.is_static() {
                field.apply("")
            } else {
                field.apply(&symbolic_value(&field.id, account, action))
            }
        })
        .collect()
}

/// Shortest decimal form of a float (`5`, `0.25`, `-1.5`)
pub fn format_float(value: f64) -> String {
    value.to_string()
}
