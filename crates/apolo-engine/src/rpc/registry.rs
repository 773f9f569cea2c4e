//! Method registry
//!
//! Maps method names to their argument and reply shapes, plus an optional
//! in-process connection serving the method for `*internal` calls. Params
//! are decoded through the registered shape, so unknown field names are
//! dropped and missing required fields are rejected before the call goes
//! out.

use apolo_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{
    AccountReply, AttrAddBalance, AttrGetAccount, AttrRemoveAccount, AttrSetAccount,
    AttrSetBalance, PingArgs,
};
use super::RpcConnection;

type Shape = Arc<dyn Fn(Value) -> AppResult<Value> + Send + Sync>;

fn shape<T>() -> Shape
where
    T: DeserializeOwned + Serialize + 'static,
{
    Arc::new(|value: Value| -> AppResult<Value> {
        let typed: T = serde_json::from_value(value).map_err(|e| AppError::Parser(e.to_string()))?;
        Ok(serde_json::to_value(typed)?)
    })
}

#[derive(Clone)]
pub struct RpcMethod {
    pub name: String,
    input: Shape,
    output: Shape,
    local: Option<Arc<dyn RpcConnection>>,
}

impl RpcMethod {
    /// Decode request params into the method's argument shape
    pub fn decode_input(&self, params: Map<String, Value>) -> AppResult<Value> {
        (self.input)(Value::Object(params))
    }

    /// Decode a reply into the method's reply shape
    pub fn decode_output(&self, reply: Value) -> AppResult<Value> {
        (self.output)(reply)
    }

    /// In-process connection, if one is registered
    pub fn local(&self) -> Option<Arc<dyn RpcConnection>> {
        self.local.clone()
    }
}

impl std::fmt::Debug for RpcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcMethod")
            .field("name", &self.name)
            .field("local", &self.local.is_some())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct RpcMethodRegistry {
    methods: HashMap<String, RpcMethod>,
}

impl RpcMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the account management methods
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<AttrSetAccount, String>("APIerSv1.SetAccount");
        registry.register::<AttrRemoveAccount, String>("APIerSv1.RemoveAccount");
        registry.register::<AttrAddBalance, String>("APIerSv1.AddBalance");
        registry.register::<AttrSetBalance, String>("APIerSv1.SetBalance");
        registry.register::<AttrGetAccount, AccountReply>("APIerSv2.GetAccount");
        registry.register::<PingArgs, String>("CoreSv1.Ping");
        registry
    }

    pub fn register<In, Out>(&mut self, name: &str)
    where
        In: DeserializeOwned + Serialize + 'static,
        Out: DeserializeOwned + Serialize + 'static,
    {
        self.methods.insert(
            name.to_string(),
            RpcMethod {
                name: name.to_string(),
                input: shape::<In>(),
                output: shape::<Out>(),
                local: None,
            },
        );
    }

    /// Serve a registered method through an in-process connection
    pub fn set_local(&mut self, name: &str, connection: Arc<dyn RpcConnection>) -> AppResult<()> {
        let method = self
            .methods
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("rpc method {}", name)))?;
        method.local = Some(connection);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> AppResult<&RpcMethod> {
        self.methods
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("rpc method {}", name)))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
