//! Newline-delimited JSON-RPC over TCP

use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, instrument, warn};

use super::types::{JsonRpcRequest, JsonRpcResponse};
use super::RpcConnection;

/// Upper bound for one reply line
const MAX_LINE_LENGTH: usize = 4 * 1024 * 1024;

pub struct TcpJsonRpcClient {
    address: String,
    framed: Mutex<Framed<TcpStream, LinesCodec>>,
    request_id: AtomicU64,
    reply_timeout: Duration,
}

impl TcpJsonRpcClient {
    /// Dial `address`, trying up to `attempts` times
    pub async fn connect(
        address: &str,
        attempts: u32,
        connect_timeout: Duration,
        reply_timeout: Duration,
    ) -> AppResult<Self> {
        let attempts = attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match tokio::time::timeout(connect_timeout, TcpStream::connect(address)).await {
                Ok(Ok(stream)) => {
                    debug!(address, attempt, "RPC connection established");
                    return Ok(Self {
                        address: address.to_string(),
                        framed: Mutex::new(Framed::new(
                            stream,
                            LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
                        )),
                        request_id: AtomicU64::new(1),
                        reply_timeout,
                    });
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = "connect timeout".to_string(),
            }
            warn!(address, attempt, error = %last_error, "RPC connect failed");
        }
        Err(AppError::Rpc(format!("{}: {}", address, last_error)))
    }
}

#[async_trait]
impl RpcConnection for TcpJsonRpcClient {
    #[instrument(skip(self, args), fields(method = %method, address = %self.address))]
    async fn call(&self, method: &str, args: Value) -> AppResult<Value> {
        let request_id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&JsonRpcRequest::new(method, args, request_id))?;

        let mut framed = self.framed.lock().await;
        framed
            .send(line)
            .await
            .map_err(|e| AppError::Rpc(format!("{}: {}", method, e)))?;

        let reply = tokio::time::timeout(self.reply_timeout, framed.next())
            .await
            .map_err(|_| AppError::Rpc(format!("{}: reply timeout", method)))?
            .ok_or_else(|| AppError::Rpc(format!("{}: connection closed", method)))?
            .map_err(|e| AppError::Rpc(format!("{}: {}", method, e)))?;

        let response: JsonRpcResponse<Value> = serde_json::from_str(&reply)
            .map_err(|e| AppError::Parser(format!("invalid JSON-RPC response: {}", e)))?;
        if let Some(err) = response.error {
            return Err(AppError::Rpc(err.to_string()));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}
