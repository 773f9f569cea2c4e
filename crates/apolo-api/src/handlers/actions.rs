//! Action list storage and execution handlers

use crate::dto::{
    ActionsResponse, ApiResponse, ExecuteActionsRequest, ExecuteActionsResponse, SetActionsRequest,
};
use actix_web::{web, HttpResponse};
use apolo_core::traits::NON_TRANSACTIONAL;
use apolo_core::AppError;
use apolo_engine::ActionExecutor;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Execute an action list against a stored account
///
/// POST /api/v1/actions/execute
#[instrument(skip(executor, req), fields(tenant = %req.tenant, account = %req.account))]
pub async fn execute_actions(
    executor: web::Data<ActionExecutor>,
    req: web::Json<ExecuteActionsRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Action execution validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let ExecuteActionsRequest {
        tenant,
        account,
        actions_id,
        actions,
    } = req.into_inner();

    let outcome = match (actions_id, actions) {
        (Some(actions_id), _) => {
            executor
                .execute_stored(&tenant, &account, &actions_id)
                .await?
        }
        (None, Some(actions)) => executor.execute_for_account(&tenant, &account, actions).await?,
        (None, None) => {
            return Err(AppError::Validation("no actions given".to_string()));
        }
    };

    let response = ExecuteActionsResponse::from(outcome);
    info!(
        executed = response.executed,
        removed = response.removed,
        "Action list executed"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Store an action list under an id, replacing any previous list
///
/// PUT /api/v1/actions/{id}
#[instrument(skip(executor, req))]
pub async fn set_actions(
    executor: web::Data<ActionExecutor>,
    path: web::Path<String>,
    req: web::Json<SetActionsRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Action list validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let id = path.into_inner();
    let SetActionsRequest { actions } = req.into_inner();
    executor
        .context()
        .data_store
        .set_actions(&id, &actions, NON_TRANSACTIONAL)
        .await?;

    info!(actions_id = %id, count = actions.len(), "Action list stored");
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ActionsResponse { id, actions },
        "Action list stored",
    )))
}

/// Get a stored action list
///
/// GET /api/v1/actions/{id}
#[instrument(skip(executor))]
pub async fn get_actions(
    executor: web::Data<ActionExecutor>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    debug!(actions_id = %id, "Fetching action list");

    let actions = executor
        .context()
        .data_store
        .get_actions(&id, false, NON_TRANSACTIONAL)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ActionsResponse { id, actions })))
}

/// Configure action routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/actions")
            .route("/execute", web::post().to(execute_actions))
            .route("/{id}", web::put().to(set_actions))
            .route("/{id}", web::get().to(get_actions)),
    );
}
