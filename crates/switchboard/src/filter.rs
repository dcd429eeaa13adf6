//! Before/after hooks wrapped around method invocation.
//!
//! Each filter is registered against a dotted scope. The empty scope covers
//! every method, `"users"` covers `users` and everything below it, and a
//! full path covers only that method. Matching is per segment, so `"user"`
//! does not cover `"users.create"`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::registry::RpcMethod;
use crate::types::{Environment, MethodError};

/// Per-call execution context shared by filters and the method.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub method: String,
    pub params: Map<String, Value>,
    pub environment: Environment,
    pub remote_addr: Option<SocketAddr>,
    /// Filled with the method's return value once it completes.
    pub response: Option<Value>,
}

impl CallContext {
    pub fn new(method: impl Into<String>, params: Map<String, Value>, environment: Environment) -> Self {
        Self {
            method: method.into(),
            params,
            environment,
            remote_addr: None,
            response: None,
        }
    }

    pub fn with_remote_addr(mut self, remote_addr: Option<SocketAddr>) -> Self {
        self.remote_addr = remote_addr;
        self
    }
}

/// A cross-cutting policy run around method calls.
#[async_trait]
pub trait Filter: Send + Sync {
    async fn before(&self, _ctx: &mut CallContext) -> Result<(), MethodError> {
        Ok(())
    }

    async fn after(&self, _ctx: &mut CallContext) -> Result<(), MethodError> {
        Ok(())
    }
}

struct Registration {
    scope: Vec<String>,
    priority: i32,
    filter: Arc<dyn Filter>,
}

impl Registration {
    fn covers(&self, method: &str) -> bool {
        let mut segments = method.split('.');
        self.scope
            .iter()
            .all(|expected| segments.next() == Some(expected.as_str()))
    }
}

/// Ordered, immutable set of filters.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Registration>,
}

impl FilterChain {
    pub fn builder() -> FilterChainBuilder {
        FilterChainBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `before` filters, the method, then `after` filters.
    ///
    /// The method's return value is stored in `ctx.response`. The first
    /// error stops the chain and is returned as-is.
    pub async fn run(&self, ctx: &mut CallContext, method: &dyn RpcMethod) -> Result<(), MethodError> {
        let applicable: Vec<Arc<dyn Filter>> = self
            .filters
            .iter()
            .filter(|r| r.covers(&ctx.method))
            .map(|r| Arc::clone(&r.filter))
            .collect();

        for filter in &applicable {
            filter.before(ctx).await?;
        }

        let response = method.call(ctx).await?;
        ctx.response = Some(response);

        for filter in &applicable {
            filter.after(ctx).await?;
        }

        Ok(())
    }
}

/// Builder for [`FilterChain`].
#[derive(Default)]
pub struct FilterChainBuilder {
    filters: Vec<Registration>,
}

impl FilterChainBuilder {
    /// Add `filter` for `scope`. Lower priorities run first; equal
    /// priorities keep registration order.
    pub fn add(&mut self, scope: &str, priority: i32, filter: Arc<dyn Filter>) -> &mut Self {
        let scope = if scope.is_empty() {
            Vec::new()
        } else {
            scope.split('.').map(str::to_string).collect()
        };
        self.filters.push(Registration {
            scope,
            priority,
            filter,
        });
        self
    }

    pub fn build(mut self) -> FilterChain {
        self.filters.sort_by_key(|r| r.priority);
        FilterChain {
            filters: self.filters,
        }
    }
}
