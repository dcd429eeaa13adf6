//! Endpoint entry point. Validates, resolves, runs the filter chain, finalizes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use serde_json::Value;
use tokio::task::JoinHandle;

use switchboard::{
    messages, status_codes, CallContext, Codec, Environment, FilterChain, FlateCodec, MethodError,
    MethodTree, RawPayload, RpcError, RpcMethod,
};

use super::access_log::log_application_error;
use super::finalizer::{finalize, RequestMeta};
use super::resolver::resolve;
use super::validator::validate_request;

/// Settings the handler needs for every request.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub version: String,
    pub environment: Environment,
    pub server_name: String,
    pub dispatch_timeout: Option<Duration>,
}

impl HandlerConfig {
    pub fn new(version: impl Into<String>, environment: Environment) -> Self {
        Self {
            version: version.into(),
            environment,
            server_name: crate::config::server_name(),
            dispatch_timeout: Some(Duration::from_millis(
                crate::config::DEFAULT_DISPATCH_TIMEOUT_MS,
            )),
        }
    }

    pub fn with_dispatch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.dispatch_timeout = timeout;
        self
    }
}

/// An incoming HTTP request as seen by the handler.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub http_method: Method,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    pub body: Bytes,
}

/// The RPC endpoint. Cheap to share behind an `Arc`; holds no per-request state.
pub struct RpcHandler {
    tree: Arc<MethodTree>,
    filters: Arc<FilterChain>,
    codec: Arc<dyn Codec>,
    config: HandlerConfig,
}

impl RpcHandler {
    pub fn new(tree: MethodTree, filters: FilterChain, config: HandlerConfig) -> Self {
        Self {
            tree: Arc::new(tree),
            filters: Arc::new(filters),
            codec: Arc::new(FlateCodec),
            config,
        }
    }

    /// Replace the compression backend.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn tree(&self) -> &MethodTree {
        &self.tree
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Handle one request end to end. Never fails: every error becomes
    /// envelope data on a 200 response.
    pub async fn handle(&self, request: RpcRequest) -> Response {
        let raw = RawPayload::from_slice(&request.body);
        let meta = RequestMeta::from_headers(&request.headers, request.remote_addr, raw.method.clone());

        let (error, response) = match self.dispatch(&request.http_method, raw, request.remote_addr).await {
            Ok(value) => (None, value),
            Err(e) => (Some(e), Value::Null),
        };

        finalize(&self.config, self.codec.as_ref(), &meta, error, response).await
    }

    async fn dispatch(
        &self,
        http_method: &Method,
        raw: RawPayload,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Value, RpcError> {
        let payload = validate_request(http_method, raw, &self.config.version)?;
        let method = resolve(&self.tree, &payload.method)?;

        let ctx = CallContext::new(payload.method, payload.params, self.config.environment)
            .with_remote_addr(remote_addr);

        self.invoke(ctx, method)
            .await
            .map_err(|e| normalize_error(e, self.config.environment))
    }

    /// Run the method through the filter chain on its own task, bounded by
    /// the dispatch timeout.
    async fn invoke(&self, mut ctx: CallContext, method: Arc<dyn RpcMethod>) -> Result<Value, MethodError> {
        let filters = Arc::clone(&self.filters);
        let method_name = ctx.method.clone();

        let mut task = DispatchTask(tokio::spawn(async move {
            filters.run(&mut ctx, method.as_ref()).await?;
            Ok::<_, MethodError>(ctx.response.take().unwrap_or(Value::Null))
        }));

        let joined = match self.config.dispatch_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task.0).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!("{method_name}() exceeded dispatch timeout of {limit:?}");
                    return Err(MethodError::status(
                        status_codes::GATEWAY_TIMEOUT,
                        messages::REQUEST_TIMED_OUT,
                    ));
                }
            },
            None => (&mut task.0).await,
        };

        joined.map_err(|e| MethodError::unexpected(format!("{method_name}() task failed: {e}")))?
    }
}

/// Aborts the dispatch task when dropped, so a timed-out or abandoned
/// request does not leave its method running.
struct DispatchTask(JoinHandle<Result<Value, MethodError>>);

impl Drop for DispatchTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Mask status-less errors outside development.
///
/// Errors carrying a status code pass through untouched. Anything else is
/// logged with full detail and replaced by the opaque `"Application error"`,
/// except in development where the detail is sent to the client.
pub fn normalize_error(error: MethodError, environment: Environment) -> RpcError {
    if error.status_code().is_some() || environment.is_development() {
        return error.into();
    }

    log_application_error(&error);
    RpcError::application_error()
}
