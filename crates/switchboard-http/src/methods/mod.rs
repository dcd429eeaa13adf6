//! Built-in methods and filters registered by the server binary.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use switchboard::{
    CallContext, Environment, Filter, FilterChain, MethodError, MethodTree, RpcMethod,
    SwitchboardResult,
};

/// `ping` → `"pong"`.
pub struct Ping;

#[async_trait]
impl RpcMethod for Ping {
    async fn call(&self, _ctx: &CallContext) -> Result<Value, MethodError> {
        Ok(json!("pong"))
    }
}

/// `echo` → its params, unchanged.
pub struct Echo;

#[async_trait]
impl RpcMethod for Echo {
    async fn call(&self, ctx: &CallContext) -> Result<Value, MethodError> {
        Ok(Value::Object(ctx.params.clone()))
    }
}

/// `server.info` → version and environment.
pub struct ServerInfo {
    pub version: String,
    pub environment: Environment,
}

#[async_trait]
impl RpcMethod for ServerInfo {
    async fn call(&self, _ctx: &CallContext) -> Result<Value, MethodError> {
        Ok(json!({
            "version": self.version,
            "environment": self.environment,
        }))
    }
}

/// Debug-level trace around every dispatched call.
pub struct TraceFilter;

#[async_trait]
impl Filter for TraceFilter {
    async fn before(&self, ctx: &mut CallContext) -> Result<(), MethodError> {
        tracing::debug!(params = ctx.params.len(), "Dispatching {}()", ctx.method);
        Ok(())
    }

    async fn after(&self, ctx: &mut CallContext) -> Result<(), MethodError> {
        tracing::debug!(
            has_response = ctx.response.is_some(),
            "Completed {}()",
            ctx.method
        );
        Ok(())
    }
}

/// Method tree holding the built-in methods.
pub fn builtin_tree(version: &str, environment: Environment) -> SwitchboardResult<MethodTree> {
    let mut builder = MethodTree::builder();
    builder
        .register("ping", Arc::new(Ping))?
        .register("echo", Arc::new(Echo))?
        .register(
            "server.info",
            Arc::new(ServerInfo {
                version: version.to_string(),
                environment,
            }),
        )?;
    Ok(builder.build())
}

/// Filter chain installed by the binary.
pub fn default_filters() -> FilterChain {
    let mut builder = FilterChain::builder();
    builder.add("", 0, Arc::new(TraceFilter));
    builder.build()
}
