//! Loads the storage object behind a cache key

use apolo_core::error::AppError;
use apolo_core::traits::{DataStore, NON_TRANSACTIONAL};
use apolo_core::AppResult;
use serde_json::Value;

use crate::keys::{
    ACCOUNT_ACTION_PLANS_PREFIX, ACCOUNT_PREFIX, ACTIONS_PREFIX, ACTION_PLAN_PREFIX,
    DESTINATION_PREFIX, REVERSE_DESTINATION_PREFIX,
};

/// Read the object `id` of the `prefix` family from storage as JSON,
/// bypassing any storage-side cache
pub async fn load_entry(store: &dyn DataStore, prefix: &str, id: &str) -> AppResult<Value> {
    let value = match prefix {
        ACTION_PLAN_PREFIX => {
            serde_json::to_value(store.get_action_plan(id, true, NON_TRANSACTIONAL).await?)?
        }
        ACCOUNT_ACTION_PLANS_PREFIX => serde_json::to_value(
            store
                .get_account_action_plans(id, true, NON_TRANSACTIONAL)
                .await?,
        )?,
        DESTINATION_PREFIX => {
            serde_json::to_value(store.get_destination(id, true, NON_TRANSACTIONAL).await?)?
        }
        REVERSE_DESTINATION_PREFIX => serde_json::to_value(
            store
                .get_reverse_destination(id, true, NON_TRANSACTIONAL)
                .await?,
        )?,
        ACTIONS_PREFIX => {
            serde_json::to_value(store.get_actions(id, true, NON_TRANSACTIONAL).await?)?
        }
        ACCOUNT_PREFIX => serde_json::to_value(store.get_account(id).await?)?,
        other => {
            return Err(AppError::InvalidInput(format!(
                "unknown cache prefix: {}",
                other
            )))
        }
    };
    Ok(value)
}
