//! Account and action list storage DTOs

use apolo_core::models::{Account, Actions, Balance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

/// Create or replace an account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetAccountRequest {
    #[validate(length(min = 1, max = 128, message = "Tenant is required"))]
    pub tenant: String,

    #[validate(length(min = 1, max = 128, message = "Account is required"))]
    pub account: String,

    /// Balances keyed by balance type
    #[serde(default)]
    pub balance_map: BTreeMap<String, Vec<Balance>>,

    #[serde(default)]
    pub allow_negative: bool,

    #[serde(default)]
    pub disabled: bool,
}

impl SetAccountRequest {
    /// Build the account this request describes
    pub fn into_account(self) -> Account {
        let mut account = Account::new(&self.tenant, &self.account);
        account.balance_map = self.balance_map;
        account.allow_negative = self.allow_negative;
        account.disabled = self.disabled;
        account
    }
}

/// Store an action list under the id given in the path
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_actions"))]
pub struct SetActionsRequest {
    pub actions: Actions,
}

fn validate_actions(req: &SetActionsRequest) -> Result<(), ValidationError> {
    if req.actions.is_empty() {
        return Err(ValidationError::new("actions")
            .with_message("an action list needs at least one action".into()));
    }
    Ok(())
}

/// Stored action list
#[derive(Debug, Clone, Serialize)]
pub struct ActionsResponse {
    pub id: String,
    pub actions: Actions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use apolo_core::models::{balance_types, Action, ActionType};

    #[test]
    fn test_into_account() {
        let mut balance_map = BTreeMap::new();
        balance_map.insert(balance_types::MONETARY.to_string(), vec![Balance::new(3.0)]);
        let req = SetAccountRequest {
            tenant: "cgrates.org".to_string(),
            account: "1002".to_string(),
            balance_map,
            allow_negative: true,
            disabled: false,
        };
        assert!(req.validate().is_ok());

        let account = req.into_account();
        assert_eq!(account.id, "cgrates.org:1002");
        assert!(account.allow_negative);
        assert_eq!(account.total_value(balance_types::MONETARY), 3.0);
    }

    #[test]
    fn test_empty_action_list_rejected() {
        let empty = SetActionsRequest {
            actions: Actions::default(),
        };
        assert!(empty.validate().is_err());

        let one = SetActionsRequest {
            actions: Actions::new(vec![Action::new("LOG", ActionType::Log)]),
        };
        assert!(one.validate().is_ok());
    }
}
