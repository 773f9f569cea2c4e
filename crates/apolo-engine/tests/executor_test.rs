//! End-to-end action list execution against in-process collaborators

use apolo_cache::{keys, Guardian, MemoryCache};
use apolo_core::config::AppConfig;
use apolo_core::models::{
    balance_types, Account, Action, ActionPlan, ActionType, Actions, Balance, BalanceFilter, Cdr,
};
use apolo_core::traits::{CacheReloader, DataStore, NON_TRANSACTIONAL};
use apolo_core::AppError;
use apolo_db::MemoryDataStore;
use apolo_engine::{ActionExecutor, EngineContext};
use std::sync::Arc;

struct Harness {
    store: Arc<MemoryDataStore>,
    cache: Arc<MemoryCache>,
    executor: ActionExecutor,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryDataStore::new());
    let cache = Arc::new(MemoryCache::new(store.clone()));
    let ctx = EngineContext::new(
        &AppConfig::default(),
        store.clone(),
        cache.clone(),
        Guardian::local(),
    )
    .unwrap();
    Harness {
        store,
        cache,
        executor: ActionExecutor::new(Arc::new(ctx)),
    }
}

fn account_with_money(value: f64) -> Account {
    let mut account = Account::new("cgrates.org", "1001");
    account
        .balance_map
        .insert(balance_types::MONETARY.to_string(), vec![Balance::new(value)]);
    account
}

fn money_action(id: &str, action_type: ActionType, value: f64, weight: f64) -> Action {
    Action::new(id, action_type)
        .with_weight(weight)
        .with_balance(BalanceFilter::of_type(balance_types::MONETARY, value))
}

#[tokio::test]
async fn test_topup_credits_account() {
    let h = harness();
    let mut account = account_with_money(10.0);
    let mut actions = Actions::new(vec![money_action("TOPUP", ActionType::TopUp, 5.0, 10.0)]);

    h.executor
        .execute(Some(&mut account), None, &mut actions)
        .await
        .unwrap();

    assert_eq!(account.total_value(balance_types::MONETARY), 15.0);
    assert_eq!(actions[0].balance_value, -5.0);
}

#[tokio::test]
async fn test_topup_then_debit_runs_by_weight() {
    let h = harness();
    let mut account = Account::new("cgrates.org", "1001");
    // listed debit first, but the topup weighs more
    let mut actions = Actions::new(vec![
        money_action("DEBIT", ActionType::Debit, 5.0, 10.0),
        money_action("TOPUP", ActionType::TopUp, 5.0, 20.0),
    ]);

    h.executor
        .execute(Some(&mut account), None, &mut actions)
        .await
        .unwrap();

    assert_eq!(actions[0].id, "TOPUP");
    assert_eq!(account.total_value(balance_types::MONETARY), 0.0);
    assert_eq!(actions[0].balance_value, -5.0);
    assert_eq!(actions[1].balance_value, 5.0);
}

#[tokio::test]
async fn test_unsupported_action_aborts_and_keeps_earlier_effects() {
    let h = harness();
    let mut account = account_with_money(10.0);
    let mut unknown = Action::new("BOGUS", ActionType::Log).with_weight(5.0);
    unknown.action_type = "*does_not_exist".to_string();
    let mut actions = Actions::new(vec![
        money_action("TOPUP", ActionType::TopUp, 5.0, 10.0),
        unknown,
        money_action("DEBIT", ActionType::Debit, 100.0, 1.0),
    ]);

    let err = h
        .executor
        .execute(Some(&mut account), None, &mut actions)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnsupportedAction(tag) if tag == "*does_not_exist"));
    // the topup stays applied, the debit never ran
    assert_eq!(account.total_value(balance_types::MONETARY), 15.0);
    assert_eq!(actions[2].balance_value, 0.0);
}

#[tokio::test]
async fn test_handler_error_aborts_list() {
    let h = harness();
    let mut actions = Actions::new(vec![
        money_action("TOPUP", ActionType::TopUp, 5.0, 10.0),
        Action::new("LOG", ActionType::Log),
    ]);
    let err = h.executor.execute(None, None, &mut actions).await.unwrap_err();
    assert!(matches!(err, AppError::NilAccount));
}

#[tokio::test]
async fn test_cdrlog_sees_amounts_of_earlier_actions() {
    let h = harness();
    let mut account = account_with_money(10.0);
    let mut actions = Actions::new(vec![
        money_action("DEBIT", ActionType::Debit, 5.0, 20.0),
        Action::new("CDRLOG", ActionType::CdrLog).with_weight(10.0),
    ]);

    h.executor
        .execute(Some(&mut account), None, &mut actions)
        .await
        .unwrap();

    let cdrs: Vec<Cdr> = serde_json::from_str(&actions[1].expiration_string).unwrap();
    assert_eq!(cdrs.len(), 1);
    assert_eq!(cdrs[0].run_id, "*debit");
    assert_eq!(cdrs[0].cost, 5.0);
    assert_eq!(cdrs[0].account, "1001");
}

#[tokio::test]
async fn test_execute_for_account_persists_changes() {
    let h = harness();
    h.store.set_account(&account_with_money(10.0)).await.unwrap();

    let outcome = h
        .executor
        .execute_for_account(
            "cgrates.org",
            "1001",
            Actions::new(vec![
                money_action("TOPUP", ActionType::TopUp, 2.5, 10.0),
                Action::new("DISABLE", ActionType::DisableAccount),
            ]),
        )
        .await
        .unwrap();

    let stored = h.store.get_account("cgrates.org:1001").await.unwrap();
    assert_eq!(stored.total_value(balance_types::MONETARY), 12.5);
    assert!(stored.disabled);
    assert_eq!(outcome.account.unwrap(), stored);
}

#[tokio::test]
async fn test_execute_stored_remove_account() {
    let h = harness();
    h.store.set_account(&account_with_money(1.0)).await.unwrap();
    let mut plan = ActionPlan::new("MONTHLY");
    plan.account_ids.insert("cgrates.org:1001".to_string());
    h.store
        .set_action_plan("MONTHLY", &plan, true, NON_TRANSACTIONAL)
        .await
        .unwrap();
    h.store
        .set_account_action_plans("cgrates.org:1001", &["MONTHLY".to_string()], true)
        .await
        .unwrap();
    h.store
        .set_actions(
            "REMOVE",
            &Actions::new(vec![Action::new("RM", ActionType::RemoveAccount)]),
            NON_TRANSACTIONAL,
        )
        .await
        .unwrap();

    let outcome = h
        .executor
        .execute_stored("cgrates.org", "1001", "REMOVE")
        .await
        .unwrap();

    assert!(outcome.account.is_none());
    assert!(h.store.get_account("cgrates.org:1001").await.is_err());
    let plan = h
        .store
        .get_action_plan("MONTHLY", false, NON_TRANSACTIONAL)
        .await
        .unwrap();
    assert!(plan.account_ids.is_empty());
    assert!(h.cache.contains(keys::ACTION_PLAN_PREFIX, "MONTHLY"));
    assert!(h
        .cache
        .get_cached(keys::ACCOUNT_ACTION_PLANS_PREFIX, "cgrates.org:1001")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_missing_account_or_actions() {
    let h = harness();
    let err = h
        .executor
        .execute_stored("cgrates.org", "404", "NOPE")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    h.store.set_account(&account_with_money(1.0)).await.unwrap();
    let err = h
        .executor
        .execute_for_account("cgrates.org", "404", Actions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));
}

#[tokio::test]
async fn test_stored_list_is_not_mutated_by_execution() {
    let h = harness();
    h.store.set_account(&account_with_money(10.0)).await.unwrap();
    let stored = Actions::new(vec![money_action("TOPUP", ActionType::TopUp, 5.0, 10.0)]);
    h.store
        .set_actions("TOPUP_5", &stored, NON_TRANSACTIONAL)
        .await
        .unwrap();

    for _ in 0..2 {
        h.executor
            .execute_stored("cgrates.org", "1001", "TOPUP_5")
            .await
            .unwrap();
    }

    let account = h.store.get_account("cgrates.org:1001").await.unwrap();
    assert_eq!(account.total_value(balance_types::MONETARY), 20.0);
    let reloaded = h
        .store
        .get_actions("TOPUP_5", false, NON_TRANSACTIONAL)
        .await
        .unwrap();
    assert_eq!(reloaded, stored);
}

#[tokio::test]
async fn test_unmatched_set_expiry_does_not_stop_list() {
    let h = harness();
    let mut account = account_with_money(10.0);
    let expiry = Action::new("EXP", ActionType::SetExpiry)
        .with_weight(20.0)
        .with_balance(BalanceFilter {
            balance_type: Some(balance_types::MONETARY.to_string()),
            id: Some("NO_SUCH".to_string()),
            expiration_date: Some(chrono::Utc::now()),
            ..Default::default()
        });
    let mut actions = Actions::new(vec![
        expiry,
        money_action("TOPUP", ActionType::TopUp, 5.0, 10.0),
    ]);

    h.executor
        .execute(Some(&mut account), None, &mut actions)
        .await
        .unwrap();

    assert_eq!(account.total_value(balance_types::MONETARY), 15.0);
    assert!(account.balances(balance_types::MONETARY)[0]
        .expiration_date
        .is_none());
}
