//! `*cgr_rpc`: templated remote procedure calls
//!
//! The extra parameters hold a JSON request template rendered against
//! `{Account, Sq, Action, Actions}`, e.g.
//!
//! ```text
//! {"Address": "*internal", "Method": "APIerSv1.SetAccount",
//!  "Params": {"Tenant": "cgrates.org", "Account": "<< .Account.ID >>"}}
//! ```

use apolo_core::models::{Account, Action, Actions, StatsQueueTriggered};
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::context::EngineContext;
use crate::registry::ActionHandler;
use crate::rpc::{self, RpcConnection, RpcRequest, INTERNAL_ADDRESS};
use crate::template;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateData<'a> {
    account: Option<&'a Account>,
    sq: Option<&'a StatsQueueTriggered>,
    action: &'a Action,
    actions: &'a Actions,
}

pub struct CgrRpc;

#[async_trait]
impl ActionHandler for CgrRpc {
    async fn execute(
        &self,
        ctx: &EngineContext,
        account: Option<&mut Account>,
        sq: Option<&StatsQueueTriggered>,
        action: &mut Action,
        siblings: &Actions,
    ) -> AppResult<()> {
        let data = serde_json::to_value(TemplateData {
            account: account.as_deref(),
            sq,
            action: &*action,
            actions: siblings,
        })?;
        let rendered = template::render(&action.extra_parameters, &data)?;
        let request: RpcRequest = serde_json::from_str(&rendered)
            .map_err(|e| AppError::Parser(format!("invalid rpc request: {}", e)))?;

        let method = ctx.rpc_methods.lookup(&request.method)?;
        let connection: Arc<dyn RpcConnection> = if request.address == INTERNAL_ADDRESS {
            method.local().ok_or_else(|| {
                AppError::Rpc(format!("no internal connection serves {}", request.method))
            })?
        } else {
            rpc::connect(
                &request.address,
                &request.transport,
                request.attempts,
                ctx.general.connect_timeout(),
                ctx.general.reply_timeout(),
            )
            .await?
        };
        let args = method.decode_input(request.params)?;

        if request.is_async {
            let method = method.clone();
            tokio::spawn(async move {
                match connection.call(&method.name, args).await {
                    Ok(reply) => info!(method = %method.name, reply = %reply, "Async RPC executed"),
                    Err(e) => warn!(method = %method.name, error = %e, "Async RPC failed"),
                }
            });
            return Ok(());
        }

        let reply = connection.call(&method.name, args).await.map_err(|e| {
            warn!(method = %method.name, error = %e, "RPC failed");
            e
        })?;
        match method.decode_output(reply.clone()) {
            Ok(out) => info!(method = %method.name, reply = %out, "RPC executed"),
            Err(e) => warn!(method = %method.name, reply = %reply, error = %e, "Unexpected RPC reply"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests_support::{context, money_account};
    use crate::rpc::RpcMethodRegistry;
    use apolo_core::models::ActionType;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl RpcConnection for Recorder {
        async fn call(&self, method: &str, args: Value) -> AppResult<Value> {
            self.calls.lock().unwrap().push((method.to_string(), args));
            Ok(json!("OK"))
        }
    }

    fn context_with_internal(recorder: Arc<Recorder>) -> EngineContext {
        let mut methods = RpcMethodRegistry::with_defaults();
        methods.set_local("APIerSv1.SetAccount", recorder).unwrap();
        context().with_rpc_methods(methods)
    }

    #[tokio::test]
    async fn test_internal_call_renders_account_fields() {
        let recorder = Arc::new(Recorder::default());
        let ctx = context_with_internal(recorder.clone());
        let mut account = money_account(1.0);
        let mut action = Action::new("RPC", ActionType::CgrRpc).with_extra_parameters(
            r#"{"Address":"*internal","Method":"APIerSv1.SetAccount",
                "Params":{"Tenant":"cgrates.org","Account":"<< .Account.ID >>","ActionPlanID":"<<.Action.Id>>"}}"#,
        );

        CgrRpc
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "APIerSv1.SetAccount");
        assert_eq!(calls[0].1["Account"], "cgrates.org:1001");
        assert_eq!(calls[0].1["ActionPlanID"], "RPC");
    }

    #[tokio::test]
    async fn test_internal_call_async() {
        let recorder = Arc::new(Recorder::default());
        let ctx = context_with_internal(recorder.clone());
        let mut action = Action::new("RPC", ActionType::CgrRpc).with_extra_parameters(
            r#"{"Address":"*internal","Method":"APIerSv1.SetAccount","Async":true,
                "Params":{"Tenant":"cgrates.org","Account":"1002"}}"#,
        );
        CgrRpc
            .execute(&ctx, None, None, &mut action, &Actions::default())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(recorder.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_http_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/jsonrpc")
            .match_body(mockito::Matcher::PartialJson(json!({
                "method": "APIerSv2.GetAccount",
                "params": [{"Tenant": "cgrates.org", "Account": "1001"}]
            })))
            .with_status(200)
            .with_body(r#"{"id":1,"result":{"ID":"cgrates.org:1001"},"error":null}"#)
            .create_async()
            .await;

        let ctx = context();
        let mut account = money_account(1.0);
        let template = format!(
            r#"{{"Address":"{}/jsonrpc","Transport":"*http_jsonrpc","Method":"APIerSv2.GetAccount",
                "Params":{{"Tenant":"cgrates.org","Account":"1001"}}}}"#,
            server.url()
        );
        let mut action = Action::new("RPC", ActionType::CgrRpc).with_extra_parameters(template);
        CgrRpc
            .execute(&ctx, Some(&mut account), None, &mut action, &Actions::default())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_errors() {
        let ctx = context();
        let mut account = money_account(1.0);

        let mut unknown_method = Action::new("RPC", ActionType::CgrRpc)
            .with_extra_parameters(r#"{"Address":"*internal","Method":"Nope.Method"}"#);
        assert!(CgrRpc
            .execute(&ctx, Some(&mut account), None, &mut unknown_method, &Actions::default())
            .await
            .unwrap_err()
            .is_not_found());

        // registered, but nothing serves it in-process
        let mut no_local = Action::new("RPC", ActionType::CgrRpc).with_extra_parameters(
            r#"{"Address":"*internal","Method":"CoreSv1.Ping","Params":{}}"#,
        );
        assert!(matches!(
            CgrRpc
                .execute(&ctx, Some(&mut account), None, &mut no_local, &Actions::default())
                .await,
            Err(AppError::Rpc(_))
        ));

        let mut bad_template = Action::new("RPC", ActionType::CgrRpc)
            .with_extra_parameters(r#"{"Method":"<< .Account.Missing >>"}"#);
        assert!(matches!(
            CgrRpc
                .execute(&ctx, Some(&mut account), None, &mut bad_template, &Actions::default())
                .await,
            Err(AppError::Template(_))
        ));

        let recorder = Arc::new(Recorder::default());
        let ctx = context_with_internal(recorder);
        let mut bad_params = Action::new("RPC", ActionType::CgrRpc).with_extra_parameters(
            r#"{"Address":"*internal","Method":"APIerSv1.SetAccount","Params":{"tenant":"x"}}"#,
        );
        assert!(matches!(
            CgrRpc
                .execute(&ctx, Some(&mut account), None, &mut bad_params, &Actions::default())
                .await,
            Err(AppError::Parser(_))
        ));
    }
}
