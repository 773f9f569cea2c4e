//! RPC transports used by `*cgr_rpc`

pub mod http;
pub mod registry;
pub mod tcp;
pub mod types;

pub use http::HttpJsonRpcClient;
pub use registry::{RpcMethod, RpcMethodRegistry};
pub use tcp::TcpJsonRpcClient;
pub use types::{RpcRequest, INTERNAL_ADDRESS};

use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A connection able to invoke named methods
#[async_trait]
pub trait RpcConnection: Send + Sync {
    async fn call(&self, method: &str, args: Value) -> AppResult<Value>;
}

/// Open a connection for `transport`; an empty transport means `*json`
pub async fn connect(
    address: &str,
    transport: &str,
    attempts: u32,
    connect_timeout: Duration,
    reply_timeout: Duration,
) -> AppResult<Arc<dyn RpcConnection>> {
    match transport {
        types::transports::HTTP_JSONRPC => Ok(Arc::new(HttpJsonRpcClient::new(address, reply_timeout)?)),
        "" | types::transports::JSON => Ok(Arc::new(
            TcpJsonRpcClient::connect(address, attempts, connect_timeout, reply_timeout).await?,
        )),
        other => Err(AppError::InvalidInput(format!("unsupported rpc transport: {}", other))),
    }
}
