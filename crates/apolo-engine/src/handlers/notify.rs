//! Outbound notifications: log lines, HTTP callbacks, mail and events

use apolo_core::models::{Account, Action, Actions, StatsQueueTriggered};
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use super::require_account;
use crate::context::EngineContext;
use crate::mailer::{spawn_mail_with_retry, MailMessage};
use crate::poster::{FallbackFileName, ACTIONS_POSTER_MODULE, CONTENT_JSON, META_HTTP_JSON};
use crate::registry::ActionHandler;

/// Separates mail recipients in `*mail_async` parameters
const RECIPIENT_SEP: char = '|';
const PARAMS_SEP: char = ',';

/// `*log`: write the account (or the queue) to the log
pub struct LogAction;

#[async_trait]
impl ActionHandler for LogAction {
    async fn execute(
        &self,
        _ctx: &EngineContext,
        account: Option<&mut Account>,
        sq: Option<&StatsQueueTriggered>,
        _action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        if let Some(account) = account.as_deref() {
            info!(account = %serde_json::to_string(account)?, "Threshold hit on account");
        } else if let Some(sq) = sq {
            info!(stats_queue = %serde_json::to_string(sq)?, "Threshold hit on stats queue");
        }
        Ok(())
    }
}

/// `*call_url` and `*call_url_async`: POST the queue (or the account) as
/// JSON to the URL in the extra parameters
pub struct CallUrl {
    /// Deliver in the background and report success immediately
    pub detached: bool,
}

#[async_trait]
impl ActionHandler for CallUrl {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let body = match (sq, account.as_deref()) {
            (Some(sq), _) => serde_json::to_vec(sq)?,
            (None, Some(account)) => serde_json::to_vec(account)?,
            (None, None) => b"null".to_vec(),
        };

        let address = action.extra_parameters.clone();
        let fallback_name = FallbackFileName::new(
            format!("{}>{}", ACTIONS_POSTER_MODULE, action.action_type),
            META_HTTP_JSON,
            &address,
            &ctx.general.json_file_suffix,
        );
        let fallback = Path::new(&ctx.general.failed_posts_dir).join(fallback_name.as_string());
        let attempts = ctx.general.poster_attempts;

        if !self.detached {
            ctx.poster
                .post(&address, CONTENT_JSON, body, attempts, Some(&fallback))
                .await?;
            return Ok(());
        }

        let poster = ctx.poster.clone();
        tokio::spawn(async move {
            if let Err(e) = poster
                .post(&address, CONTENT_JSON, body, attempts, Some(&fallback))
                .await
            {
                warn!(address = %address, error = %e, "Detached post failed");
            }
        });
        Ok(())
    }
}

/// `*mail_async`: mail a threshold notice to the `|`-separated recipients
/// in the extra parameters
pub struct MailAsync;

fn account_message(to: Vec<String>, account: &Account) -> AppResult<MailMessage> {
    Ok(MailMessage {
        to,
        subject: format!("[Apolo Notification] Threshold hit on Balance: {}", account.id),
        body: format!(
            "Time: \r\n\t{}\r\n\r\nBalance:\r\n\t{}\r\n\r\nYours faithfully,\r\nApolo Balance Monitor\r\n",
            Utc::now().to_rfc3339(),
            serde_json::to_string(account)?
        ),
    })
}

fn queue_message(to: Vec<String>, sq: &StatsQueueTriggered) -> AppResult<MailMessage> {
    Ok(MailMessage {
        to,
        subject: format!("[Apolo Notification] Threshold hit on StatsQueueId: {}", sq.id),
        body: format!(
            "Time: \r\n\t{}\r\n\r\nStatsQueueId:\r\n\t{}\r\n\r\nMetrics:\r\n\t{}\r\n\r\nTrigger:\r\n\t{}\r\n\r\nYours faithfully,\r\nApolo CDR Stats Monitor\r\n",
            Utc::now().to_rfc3339(),
            sq.id,
            serde_json::to_string(&sq.metrics)?,
            serde_json::to_string(&sq.trigger)?
        ),
    })
}

/// Recipients from `to1|to2,...`; only the first comma-separated field is used
fn recipients(extra_parameters: &str) -> Vec<String> {
    extra_parameters
        .split(PARAMS_SEP)
        .next()
        .unwrap_or("")
        .split(RECIPIENT_SEP)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl ActionHandler for MailAsync {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let to = recipients(&action.extra_parameters);
        if to.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "action {} has no mail recipients",
                action.id
            )));
        }

        let message = match (account.as_deref(), sq) {
            (Some(account), _) => account_message(to, account)?,
            (None, Some(sq)) => queue_message(to, sq)?,
            (None, None) => return Err(AppError::NilAccount),
        };
        spawn_mail_with_retry(
            ctx.mailer.clone(),
            ctx.mailer_config.from_address.clone(),
            message,
            ctx.mailer_config.retry_interval(),
        );
        Ok(())
    }
}

/// `*publish_account`: emit an event for the account and one per balance
pub struct PublishAccount;

#[async_trait]
impl ActionHandler for PublishAccount {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        _sq: Option<&StatsQueueTriggered>,
        _action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let account = require_account(account)?;
        ctx.publisher.publish(account.as_event()).await?;
        for (balance_type, balances) in &account.balance_map {
            for balance in balances {
                ctx.publisher
                    .publish(balance.as_event(&account.id, balance_type))
                    .await?;
            }
        }
        Ok(())
    }
}
