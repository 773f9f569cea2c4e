//! RPC wire types and the argument shapes of the built-in methods

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Address that routes a call to an in-process connection
pub const INTERNAL_ADDRESS: &str = "*internal";

pub mod transports {
    /// Newline-delimited JSON-RPC over TCP
    pub const JSON: &str = "*json";
    /// JSON-RPC over HTTP POST
    pub const HTTP_JSONRPC: &str = "*http_jsonrpc";
}

/// Parsed `*cgr_rpc` parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RpcRequest {
    pub address: String,
    pub transport: String,
    pub method: String,
    pub attempts: u32,
    #[serde(rename = "Async")]
    pub is_async: bool,
    pub params: Map<String, Value>,
}

/// JSON-RPC request
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<T: Serialize> {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Vec<T>,
    pub id: u64,
}

impl<T: Serialize> JsonRpcRequest<T> {
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params: vec![params],
            id,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub id: Option<Value>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// Error member: servers send either a bare message or a code/message object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcError {
    Message(String),
    Object { code: i32, message: String },
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonRpcError::Message(message) => f.write_str(message),
            JsonRpcError::Object { code, message } => write!(f, "{} (code {})", message, code),
        }
    }
}

// ---------------------------------------------------------------------------
// Method arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrGetAccount {
    pub tenant: String,
    pub account: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrSetAccount {
    pub tenant: String,
    pub account: String,
    #[serde(default, rename = "ActionPlanID")]
    pub action_plan_id: String,
    #[serde(default, rename = "ActionTriggersID")]
    pub action_triggers_id: String,
    #[serde(default)]
    pub allow_negative: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
    #[serde(default)]
    pub reload_scheduler: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrRemoveAccount {
    pub tenant: String,
    pub account: String,
    #[serde(default)]
    pub reload_scheduler: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrAddBalance {
    pub tenant: String,
    pub account: String,
    pub balance_type: String,
    pub value: f64,
    #[serde(default, rename = "BalanceID")]
    pub balance_id: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrBalanceSelector {
    #[serde(default, rename = "ID")]
    pub id: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttrSetBalance {
    pub tenant: String,
    pub account: String,
    pub balance_type: String,
    pub value: f64,
    #[serde(default)]
    pub balance: Option<AttrBalanceSelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PingArgs {}

/// Account summary returned by account getters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AccountReply {
    #[serde(rename = "ID")]
    pub id: String,
    pub balance_map: Value,
    pub allow_negative: bool,
    pub disabled: bool,
}
