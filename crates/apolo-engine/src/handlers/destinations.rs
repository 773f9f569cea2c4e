//! `*set_ddestinations`: rebuild a dynamic destination from queue metrics

use apolo_cache::keys::DESTINATION_PREFIX;
use apolo_core::models::{Account, Action, Actions, Destination, StatsQueueTriggered};
use apolo_core::traits::NON_TRANSACTIONAL;
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use tracing::info;

use super::require_account;
use crate::context::EngineContext;
use crate::registry::ActionHandler;

/// Prefix marking dynamic destination ids
pub const DDC_PREFIX: &str = "*ddc";

pub struct SetDdestinations;

#[async_trait]
impl ActionHandler for SetDdestinations {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        sq: Option<&StatsQueueTriggered>,
        _action: &mut Action,
        _siblings: &Actions,
    ) -> AppResult<()> {
        let account = require_account(account)?;
        let destination_id = account
            .balance_map
            .values()
            .flatten()
            .flat_map(|b| b.destination_ids.iter())
            .find(|id| id.starts_with(DDC_PREFIX))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{} destination", DDC_PREFIX)))?;
        let sq = sq.ok_or_else(|| {
            AppError::InvalidInput("dynamic destinations need a triggering stats queue".to_string())
        })?;

        // metric names are the new prefixes
        let new_destination =
            Destination::new(destination_id.clone(), sq.metrics.keys().cloned().collect());
        let old_destination = match ctx
            .data_store
            .get_destination(&destination_id, false, NON_TRANSACTIONAL)
            .await
        {
            Ok(dest) => Some(dest),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        ctx.data_store
            .set_destination(&new_destination, NON_TRANSACTIONAL)
            .await?;
        ctx.cache
            .reload(DESTINATION_PREFIX, &[destination_id.clone()], true)
            .await?;
        // a first write indexes every new prefix
        let old = old_destination.unwrap_or_default();
        ctx.data_store
            .update_reverse_destination(&old, &new_destination, NON_TRANSACTIONAL)
            .await?;

        info!(
            destination = %destination_id,
            prefixes = new_destination.prefixes.len(),
            "Dynamic destination updated"
        );
        Ok(())
    }
}
