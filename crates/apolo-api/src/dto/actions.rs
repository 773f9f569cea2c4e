//! Action execution DTOs

use apolo_core::models::{Account, Actions};
use apolo_engine::ExecutionOutcome;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Action execution request
///
/// Exactly one of `actions_id` (a stored list) or `actions` (an inline
/// list) must be given.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_source"))]
pub struct ExecuteActionsRequest {
    /// Account tenant
    #[validate(length(min = 1, max = 128, message = "Tenant is required"))]
    pub tenant: String,

    /// Account name within the tenant
    #[validate(length(min = 1, max = 128, message = "Account is required"))]
    pub account: String,

    /// Id of a stored action list
    pub actions_id: Option<String>,

    /// Inline action list
    pub actions: Option<Actions>,
}

fn validate_source(req: &ExecuteActionsRequest) -> Result<(), ValidationError> {
    match (req.actions_id.as_deref(), req.actions.as_ref()) {
        (Some(id), None) if !id.is_empty() => Ok(()),
        (None, Some(actions)) if !actions.is_empty() => Ok(()),
        _ => Err(ValidationError::new("actions_source")
            .with_message("exactly one of actions_id or a non-empty actions list is required".into())),
    }
}

/// Action execution response
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteActionsResponse {
    /// Account after execution, absent when the list removed it
    pub account: Option<Account>,
    /// Whether the account was removed
    pub removed: bool,
    /// Number of executed actions
    pub executed: usize,
    /// The executed list, in execution order
    pub actions: Actions,
}

impl From<ExecutionOutcome> for ExecuteActionsResponse {
    fn from(outcome: ExecutionOutcome) -> Self {
        Self {
            removed: outcome.account.is_none(),
            executed: outcome.actions.len(),
            account: outcome.account,
            actions: outcome.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apolo_core::models::{Action, ActionType};

    fn request(actions_id: Option<&str>, actions: Option<Actions>) -> ExecuteActionsRequest {
        ExecuteActionsRequest {
            tenant: "cgrates.org".to_string(),
            account: "1001".to_string(),
            actions_id: actions_id.map(String::from),
            actions,
        }
    }

    #[test]
    fn test_source_validation() {
        let inline = Actions::new(vec![Action::new("LOG", ActionType::Log)]);

        assert!(request(Some("TOPUP_10"), None).validate().is_ok());
        assert!(request(None, Some(inline.clone())).validate().is_ok());
        assert!(request(None, None).validate().is_err());
        assert!(request(Some("TOPUP_10"), Some(inline)).validate().is_err());
        assert!(request(Some(""), None).validate().is_err());
        assert!(request(None, Some(Actions::default())).validate().is_err());
    }

    #[test]
    fn test_tenant_required() {
        let mut req = request(Some("TOPUP_10"), None);
        req.tenant.clear();
        let err = req.validate().unwrap_err();
        assert!(err.field_errors().contains_key("tenant"));
    }
}
