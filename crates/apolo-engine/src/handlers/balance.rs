//! Balance mutations: top-ups, debits, transfers, removals and expiry

use apolo_core::models::{balance_types, Account, Action, Actions, StatsQueueTriggered};
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;

use super::require_account;
use crate::context::EngineContext;
use crate::registry::ActionHandler;

/// Flip a positive amount so the debit routine credits it
fn make_negative(action: &mut Action) {
    if let Some(filter) = action.balance.as_mut() {
        if filter.value() > 0.0 {
            filter.set_value(-filter.value());
        }
    }
}

/// Credit through the debit routine on a copy, keeping the stored action
/// untouched apart from the recorded amount
fn credit(
    account: &mut Account,
    action: &mut Action,
    reset: bool,
    reset_if_negative: bool,
) -> AppResult<()> {
    let mut copy = action.clone();
    make_negative(&mut copy);
    account.debit_balance_action(&mut copy, reset, reset_if_negative)?;
    action.balance_value = copy.balance_value;
    Ok(())
}

/// `*topup` and `*topup_reset`
pub struct TopUp {
    pub reset: bool,
}

#[async_trait]
impl ActionHandler for TopUp {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        credit(require_account(account)?, action, self.reset, false)
    }
}

/// `*topup_zero_negative`: zero negative balances before crediting
pub struct TopUpZeroNegative;

#[async_trait]
impl ActionHandler for TopUpZeroNegative {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        credit(require_account(account)?, action, false, true)
    }
}

/// `*debit` and `*debit_reset`
pub struct Debit {
    pub reset: bool,
}

#[async_trait]
impl ActionHandler for Debit {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        require_account(account)?.debit_balance_action(action, self.reset, false)
    }
}

/// `*transfer_monetary_default`: sweep positive monetary balances matching
/// the filter into the `*default` balance
pub struct TransferMonetaryDefault;

#[async_trait]
impl ActionHandler for TransferMonetaryDefault {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let account = require_account(account)?;
        if !account.balance_map.contains_key(balance_types::MONETARY) {
            return Err(AppError::NotFound(format!(
                "monetary balances of {}",
                account.id
            )));
        }

        let default_idx = account.default_money_balance_index();
        let Some(bucket) = account.balance_map.get_mut(balance_types::MONETARY) else {
            return Err(AppError::NotFound("monetary balances".to_string()));
        };
        let default_uuid = bucket[default_idx].uuid.clone();
        let default_id = bucket[default_idx].id.clone();

        let mut total = 0.0;
        for (idx, balance) in bucket.iter_mut().enumerate() {
            if idx == default_idx || balance.uuid == default_uuid || balance.id == default_id {
                continue;
            }
            if balance.value > 0.0 && balance.match_filter(action.balance.as_ref(), false, false) {
                total += balance.value;
                balance.value = 0.0;
            }
        }
        bucket[default_idx].value += total;
        Ok(())
    }
}

/// `*remove_balance`: drop every balance of the filter's type that matches
pub struct RemoveBalance;

#[async_trait]
impl ActionHandler for RemoveBalance {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let account = require_account(account)?;
        let filter = action.balance.as_ref();
        let balance_type = filter.map(|f| f.balance_type()).unwrap_or("");
        let bucket = account
            .balance_map
            .get_mut(balance_type)
            .ok_or_else(|| AppError::NotFound(format!("{} balances", balance_type)))?;

        let before = bucket.len();
        let mut idx = 0;
        while idx < bucket.len() {
            if bucket[idx].match_filter(filter, false, false) {
                bucket.swap_remove(idx);
            } else {
                idx += 1;
            }
        }
        if bucket.len() == before {
            return Err(AppError::NotFound("no matching balance".to_string()));
        }
        Ok(())
    }
}

/// `*set_balance`: create or update the balance addressed by UUID or ID
pub struct SetBalance;

#[async_trait]
impl ActionHandler for SetBalance {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        require_account(account)?.set_balance_action(action)
    }
}

/// `*set_expiry`: copy the filter's expiration onto matching balances
pub struct SetExpiry;

#[async_trait]
impl ActionHandler for SetExpiry {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let account = require_account(account)?;
        let filter = action
            .balance
            .as_ref()
            .ok_or_else(|| AppError::InvalidInput(format!("action {} has no balance", action.id)))?;

        // nothing matching is not an error
        if let Some(bucket) = account.balance_map.get_mut(filter.balance_type()) {
            for balance in bucket.iter_mut() {
                // expired balances may be revived by a new expiry
                if balance.match_filter(Some(filter), false, true) {
                    balance.expiration_date = filter.expiration_date;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests_support::{context, money_account};
    use apolo_core::models::{ActionType, Balance, BalanceFilter, DEFAULT_BALANCE_ID};
    use chrono::{Duration, Utc};

    fn topup(value: f64) -> Action {
        Action::new("TOPUP", ActionType::TopUp)
            .with_balance(BalanceFilter::of_type(balance_types::MONETARY, value))
    }

    #[tokio::test]
    async fn test_topup_credits_and_records_negative_amount() {
        let ctx = context();
        let mut account = money_account(10.0);
        let mut action = topup(5.0);

        TopUp { reset: false }
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();

        assert_eq!(account.total_value(balance_types::MONETARY), 15.0);
        assert_eq!(action.balance_value, -5.0);
        // the stored action keeps its positive amount
        assert_eq!(action.balance.as_ref().unwrap().value(), 5.0);
    }

    #[tokio::test]
    async fn test_topup_reset_replaces_value() {
        let ctx = context();
        let mut account = money_account(10.0);
        let mut action = topup(3.0);
        TopUp { reset: true }
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();
        assert_eq!(account.total_value(balance_types::MONETARY), 3.0);
    }

    #[tokio::test]
    async fn test_topup_zero_negative() {
        let ctx = context();
        let mut account = money_account(-4.0);
        let mut action = topup(5.0);
        TopUpZeroNegative
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();
        assert_eq!(account.total_value(balance_types::MONETARY), 5.0);

        let mut positive = money_account(2.0);
        let mut action = topup(5.0);
        TopUpZeroNegative
            .execute(&ctx, Some(&mut positive), None, &mut action, &Actions::default())
            .await
            .unwrap();
        assert_eq!(positive.total_value(balance_types::MONETARY), 7.0);
    }

    #[tokio::test]
    async fn test_debit_records_positive_amount() {
        let ctx = context();
        let mut account = money_account(10.0);
        let mut action = Action::new("DEBIT", ActionType::Debit)
            .with_balance(BalanceFilter::of_type(balance_types::MONETARY, 4.0));
        Debit { reset: false }
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();
        assert_eq!(account.total_value(balance_types::MONETARY), 6.0);
        assert_eq!(action.balance_value, 4.0);
    }

    #[tokio::test]
    async fn test_balance_handlers_require_account() {
        let ctx = context();
        let mut action = topup(5.0);
        let err = TopUp { reset: false }
            .execute(&ctx, None, None, &mut action, &Actions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NilAccount));

        let err = SetExpiry
            .execute(&ctx, None, None, &mut action, &Actions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NilAccount));
    }

    #[tokio::test]
    async fn test_transfer_monetary_default() {
        let ctx = context();
        let mut account = money_account(3.0);
        let mut default = Balance::new(1.0);
        default.id = DEFAULT_BALANCE_ID.to_string();
        let bucket = account.balance_map.get_mut(balance_types::MONETARY).unwrap();
        bucket.push(default);
        bucket.push(Balance::new(-2.0));
        bucket.push(Balance::new(4.0));

        let mut action = Action::new("XFER", ActionType::TransferMonetaryDefault)
            .with_balance(BalanceFilter {
                balance_type: Some(balance_types::MONETARY.to_string()),
                ..Default::default()
            });
        TransferMonetaryDefault
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();

        let balances = account.balances(balance_types::MONETARY);
        let default = balances.iter().find(|b| b.is_default()).unwrap();
        assert_eq!(default.value, 8.0);
        // negative balances stay where they are
        assert!(balances.iter().any(|b| b.value == -2.0));
        assert_eq!(account.total_value(balance_types::MONETARY), 6.0);
    }

    #[tokio::test]
    async fn test_transfer_without_monetary_balances() {
        let ctx = context();
        let mut account = apolo_core::models::Account::new("cgrates.org", "1001");
        let mut action = Action::new("XFER", ActionType::TransferMonetaryDefault);
        let err = TransferMonetaryDefault
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_balance() {
        let ctx = context();
        let mut account = money_account(3.0);
        let mut bonus = Balance::new(7.0);
        bonus.id = "BONUS".to_string();
        account
            .balance_map
            .get_mut(balance_types::MONETARY)
            .unwrap()
            .push(bonus);

        let mut action = Action::new("RM", ActionType::RemoveBalance).with_balance(BalanceFilter {
            balance_type: Some(balance_types::MONETARY.to_string()),
            id: Some("BONUS".to_string()),
            ..Default::default()
        });
        RemoveBalance
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();
        assert_eq!(account.balances(balance_types::MONETARY).len(), 1);

        // second removal finds nothing
        let err = RemoveBalance
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let bucket = account.balances(balance_types::MONETARY);
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].value, 3.0);
    }

    #[tokio::test]
    async fn test_set_expiry_updates_matches_only() {
        let ctx = context();
        let mut account = money_account(3.0);
        let mut expired = Balance::new(2.0);
        expired.expiration_date = Some(Utc::now() - Duration::days(1));
        expired.destination_ids.insert("DST_FS".to_string());
        let mut tagged = Balance::new(4.0);
        tagged.destination_ids.insert("DST_FS".to_string());
        let untouched_expiry = Some(Utc::now() + Duration::days(3));
        let mut other = Balance::new(5.0);
        other.destination_ids.insert("DST_OTHER".to_string());
        other.expiration_date = untouched_expiry;
        let bucket = account.balance_map.get_mut(balance_types::MONETARY).unwrap();
        bucket.clear();
        bucket.extend([expired, tagged, other]);

        let new_expiry = Utc::now() + Duration::days(30);
        let mut action = Action::new("EXP", ActionType::SetExpiry).with_balance(BalanceFilter {
            balance_type: Some(balance_types::MONETARY.to_string()),
            destination_ids: Some(["DST_FS".to_string()].into_iter().collect()),
            expiration_date: Some(new_expiry),
            ..Default::default()
        });
        SetExpiry
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();

        let balances = account.balances(balance_types::MONETARY);
        assert_eq!(balances[0].expiration_date, Some(new_expiry));
        assert_eq!(balances[1].expiration_date, Some(new_expiry));
        assert_eq!(balances[2].expiration_date, untouched_expiry);
    }

    #[tokio::test]
    async fn test_set_expiry_without_match_succeeds() {
        let ctx = context();
        let mut account = money_account(3.0);
        let before = account.clone();
        let mut other_type = Action::new("EXP", ActionType::SetExpiry).with_balance(BalanceFilter {
            balance_type: Some(balance_types::SMS.to_string()),
            expiration_date: Some(Utc::now() + Duration::days(30)),
            ..Default::default()
        });
        SetExpiry
            .execute(&ctx, Some(&mut account), None, &mut other_type, &Actions::default())
            .await
            .unwrap();
        assert_eq!(account, before);
    }

    #[tokio::test]
    async fn test_set_balance_creates_then_updates() {
        let ctx = context();
        let mut account = money_account(3.0);
        let mut action = Action::new("SET", ActionType::SetBalance).with_balance(BalanceFilter {
            balance_type: Some(balance_types::MONETARY.to_string()),
            id: Some("BONUS".to_string()),
            value: Some(12.0),
            ..Default::default()
        });
        SetBalance
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();
        action.balance.as_mut().unwrap().set_value(1.0);
        SetBalance
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();

        let balances = account.balances(balance_types::MONETARY);
        assert_eq!(balances.len(), 2);
        assert_eq!(balances.iter().find(|b| b.id == "BONUS").unwrap().value, 1.0);
    }
}
