//! `*cdrlog`: one CDR per balance mutation in the list
//!
//! The CDR fields come from a template of RSR expressions. The default
//! template can be overridden field by field with a JSON object in the
//! extra parameters, e.g. `{"Category":"^ddi","MediationRunId":"^did_run"}`.
//! The produced CDRs are stored when CDR storage is configured and are
//! always recorded, JSON encoded, in the action's `expiration_string`.

use apolo_core::models::{Account, Action, Actions, Cdr, StatsQueueTriggered};
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use uuid::Uuid;

use crate::context::EngineContext;
use crate::field::{parse_rsr_fields, parse_template_value, RsrField, FIELDS_SEP};
use crate::registry::ActionHandler;

pub const CDRLOG_SOURCE: &str = "*cdrlog";

const DEFAULT_TEMPLATE: [(&str, &str); 7] = [
    ("ToR", "BalanceType"),
    ("OriginHost", "^127.0.0.1"),
    ("RequestType", "^*prepaid"),
    ("Tenant", "Tenant"),
    ("Account", "Account"),
    ("Subject", "Account"),
    ("Cost", "ActionValue"),
];

/// Usage recorded on every synthesized CDR, in nanoseconds
const CDR_USAGE: i64 = 1;

/// Default template with the JSON overrides applied
fn build_template(extra_parameters: &str) -> AppResult<BTreeMap<String, Vec<RsrField>>> {
    let mut template = BTreeMap::new();
    for (field, expr) in DEFAULT_TEMPLATE {
        template.insert(field.to_string(), parse_rsr_fields(expr, FIELDS_SEP)?);
    }
    if !extra_parameters.trim().is_empty() {
        let overrides: HashMap<String, String> = serde_json::from_str(extra_parameters)
            .map_err(|e| AppError::Parser(format!("invalid cdrlog template: {}", e)))?;
        for (field, expr) in overrides {
            template.insert(field, parse_rsr_fields(&expr, FIELDS_SEP)?);
        }
    }
    Ok(template)
}

fn cgrid(origin_id: &str, setup_time: DateTime<Utc>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(origin_id.as_bytes());
    hasher.update(setup_time.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    hex::encode(hasher.finalize())
}

pub struct CdrLog;

#[async_trait]
impl ActionHandler for CdrLog {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        siblings: &Actions,
    ) -> AppResult<()> {
        let template = build_template(&action.extra_parameters)?;
        let account = account.as_deref();

        let mut cdrs = Vec::new();
        for sibling in siblings.iter() {
            let loggable = sibling.kind().map_or(false, |t| t.is_cdr_loggable());
            if !loggable || sibling.balance.is_none() {
                continue;
            }

            let now = Utc::now();
            let origin_id = Uuid::new_v4().to_string();
            let mut cdr = Cdr {
                cgrid: cgrid(&origin_id, now),
                run_id: sibling.action_type.clone(),
                source: CDRLOG_SOURCE.to_string(),
                origin_id,
                setup_time: now,
                answer_time: now,
                usage: CDR_USAGE,
                ..Default::default()
            };
            for (field, rsr_fields) in &template {
                cdr.set_field(field, parse_template_value(rsr_fields, account, sibling));
            }

            if let Some(storage) = &ctx.cdr_storage {
                storage.set_cdr(&cdr, true).await?;
            }
            debug!(cgrid = %cdr.cgrid, run_id = %cdr.run_id, cost = cdr.cost, "CDR logged");
            cdrs.push(cdr);
        }

        action.expiration_string = serde_json::to_string(&cdrs)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests_support::{context, money_account};
    use apolo_core::models::{balance_types, ActionType, BalanceFilter};
    use apolo_core::traits::CdrStorage;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingStorage {
        stored: Mutex<Vec<(Cdr, bool)>>,
    }

    #[async_trait]
    impl CdrStorage for RecordingStorage {
        async fn set_cdr(&self, cdr: &Cdr, allow_update: bool) -> AppResult<()> {
            self.stored.lock().unwrap().push((cdr.clone(), allow_update));
            Ok(())
        }
    }

    fn debit(value: f64) -> Action {
        let mut action = Action::new("DEBIT", ActionType::Debit)
            .with_balance(BalanceFilter::of_type(balance_types::MONETARY, value));
        action.balance_value = value;
        action
    }

    #[tokio::test]
    async fn test_one_cdr_per_loggable_sibling() {
        let storage = Arc::new(RecordingStorage::default());
        let ctx = context().with_cdr_storage(storage.clone());
        let mut account = money_account(10.0);
        let siblings = Actions::new(vec![
            debit(5.0),
            Action::new("LOG", ActionType::Log),
            Action::new("NO_BALANCE", ActionType::TopUp),
            Action::new("CDRLOG", ActionType::CdrLog),
        ]);
        let mut action = siblings[3].clone();

        CdrLog
            .execute(&ctx, Some(&mut account), None, &mut action, &siblings)
            .await
            .unwrap();

        let cdrs: Vec<Cdr> = serde_json::from_str(&action.expiration_string).unwrap();
        assert_eq!(cdrs.len(), 1);
        let cdr = &cdrs[0];
        assert_eq!(cdr.run_id, "*debit");
        assert_eq!(cdr.source, CDRLOG_SOURCE);
        assert_eq!(cdr.tor, balance_types::MONETARY);
        assert_eq!(cdr.origin_host, "127.0.0.1");
        assert_eq!(cdr.request_type, "*prepaid");
        assert_eq!(cdr.tenant, "cgrates.org");
        assert_eq!(cdr.account, "1001");
        assert_eq!(cdr.subject, "1001");
        assert_eq!(cdr.cost, 5.0);
        assert_eq!(cdr.usage, 1);
        assert_eq!(cdr.cgrid, cgrid(&cdr.origin_id, cdr.setup_time));

        let stored = storage.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].1);
    }

    #[tokio::test]
    async fn test_template_overrides() {
        let ctx = context();
        let mut account = money_account(10.0);
        let siblings = Actions::new(vec![debit(2.5)]);
        let mut action = Action::new("CDRLOG", ActionType::CdrLog).with_extra_parameters(
            r#"{"Subject":"^rif","Category":"^ddi","BalanceValue":"BalanceValue"}"#,
        );

        CdrLog
            .execute(&ctx, Some(&mut account), None, &mut action, &siblings)
            .await
            .unwrap();

        let cdrs: Vec<Cdr> = serde_json::from_str(&action.expiration_string).unwrap();
        assert_eq!(cdrs[0].subject, "rif");
        assert_eq!(cdrs[0].category, "ddi");
        assert_eq!(cdrs[0].account, "1001");
        assert_eq!(cdrs[0].extra_fields["BalanceValue"], "2.5");
    }

    #[tokio::test]
    async fn test_no_loggable_siblings_records_empty_list() {
        let ctx = context();
        let siblings = Actions::new(vec![Action::new("LOG", ActionType::Log)]);
        let mut action = Action::new("CDRLOG", ActionType::CdrLog);
        CdrLog
            .execute(&ctx, None, None, &mut action, &siblings)
            .await
            .unwrap();
        assert_eq!(action.expiration_string, "[]");
    }

    #[tokio::test]
    async fn test_invalid_template_is_rejected() {
        let ctx = context();
        let mut action = Action::new("CDRLOG", ActionType::CdrLog).with_extra_parameters("{nope");
        let err = CdrLog
            .execute(&ctx, None, None, &mut action, &Actions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Parser(_)));
    }
}
