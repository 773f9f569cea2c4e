//! JSON-RPC over HTTP POST

use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::types::{JsonRpcRequest, JsonRpcResponse};
use super::RpcConnection;

pub struct HttpJsonRpcClient {
    http_client: Client,
    url: String,
    request_id: AtomicU64,
}

impl HttpJsonRpcClient {
    pub fn new(url: &str, reply_timeout: Duration) -> AppResult<Self> {
        let http_client = ClientBuilder::new()
            .timeout(reply_timeout)
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Rpc(format!("failed to build client: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcConnection for HttpJsonRpcClient {
    #[instrument(skip(self, args), fields(method = %method, url = %self.url))]
    async fn call(&self, method: &str, args: Value) -> AppResult<Value> {
        let request_id = self.next_id();
        let request = JsonRpcRequest::new(method, args, request_id);
        debug!(id = request_id, "JSON-RPC request");

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Rpc(format!("{}: reply timeout", method))
                } else {
                    AppError::Rpc(format!("{}: {}", method, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "JSON-RPC HTTP error");
            return Err(AppError::Rpc(format!("{}: HTTP status {}", method, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Rpc(format!("failed to read response body: {}", e)))?;
        debug!(body = %body, "JSON-RPC response");

        let rpc_response: JsonRpcResponse<Value> = serde_json::from_str(&body)
            .map_err(|e| AppError::Parser(format!("invalid JSON-RPC response: {}", e)))?;
        if let Some(err) = rpc_response.error {
            return Err(AppError::Rpc(err.to_string()));
        }
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_request_id_increment() {
        let client = HttpJsonRpcClient::new("http://localhost:2080/jsonrpc", Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.next_id(), 1);
        assert_eq!(client.next_id(), 2);
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/jsonrpc")
            .match_body(Matcher::PartialJson(json!({
                "method": "CoreSv1.Ping",
                "params": [{}]
            })))
            .with_status(200)
            .with_body(r#"{"id":1,"result":"Pong","error":null}"#)
            .create_async()
            .await;

        let client =
            HttpJsonRpcClient::new(&format!("{}/jsonrpc", server.url()), Duration::from_secs(2))
                .unwrap();
        let reply = client.call("CoreSv1.Ping", json!({})).await.unwrap();
        assert_eq!(reply, json!("Pong"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_call_maps_rpc_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/jsonrpc")
            .with_status(200)
            .with_body(r#"{"id":1,"result":null,"error":"ACCOUNT_NOT_FOUND"}"#)
            .create_async()
            .await;

        let client =
            HttpJsonRpcClient::new(&format!("{}/jsonrpc", server.url()), Duration::from_secs(2))
                .unwrap();
        let err = client
            .call("APIerSv2.GetAccount", json!({"Tenant": "cgrates.org", "Account": "1001"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Rpc(msg) if msg == "ACCOUNT_NOT_FOUND"));
    }
}
