//! Account handlers

use crate::dto::{ApiResponse, SetAccountRequest};
use actix_web::{web, HttpResponse};
use apolo_core::models::account_key;
use apolo_core::AppError;
use apolo_engine::ActionExecutor;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Create or replace an account
///
/// POST /api/v1/accounts
#[instrument(skip(executor, req), fields(tenant = %req.tenant, account = %req.account))]
pub async fn set_account(
    executor: web::Data<ActionExecutor>,
    req: web::Json<SetAccountRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Account validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let account = req.into_inner().into_account();
    executor.context().data_store.set_account(&account).await?;

    info!(account = %account.id, "Account stored");
    Ok(HttpResponse::Created().json(ApiResponse::with_message(account, "Account stored")))
}

/// Get an account with its balances
///
/// GET /api/v1/accounts/{tenant}/{account}
#[instrument(skip(executor))]
pub async fn get_account(
    executor: web::Data<ActionExecutor>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (tenant, account) = path.into_inner();
    let account_id = account_key(&tenant, &account);
    debug!(account = %account_id, "Fetching account");

    let account = executor.context().data_store.get_account(&account_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(account)))
}

/// Configure account routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/accounts")
            .route("", web::post().to(set_account))
            .route("/{tenant}/{account}", web::get().to(get_account)),
    );
}
