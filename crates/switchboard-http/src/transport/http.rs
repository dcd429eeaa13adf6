//! HTTP transport serving `/rpc` and `/health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, DefaultBodyLimit, State},
    http::{HeaderMap, Method},
    response::{Json as AxumJson, Response},
    routing::{any, get},
    Router,
};

use crate::protocol::{RpcHandler, RpcRequest};
use crate::types::{ServerError, ServerResult};

/// Path of the single RPC route.
pub const RPC_PATH: &str = "/rpc";

/// Largest request body buffered. Anything bigger is answered as an
/// invalid payload.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Build the router. Every verb on `/rpc` reaches the handler, which answers
/// non-POST requests with an error envelope.
pub fn router(handler: Arc<RpcHandler>) -> Router {
    Router::new()
        .route(RPC_PATH, any(handle_rpc))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(handler)
}

/// HTTP server wrapping an [`RpcHandler`].
pub struct HttpTransport {
    handler: Arc<RpcHandler>,
}

impl HttpTransport {
    pub fn new(handler: RpcHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Serve on `addr` until Ctrl-C.
    pub async fn run(&self, addr: &str) -> ServerResult<()> {
        let app = router(Arc::clone(&self.handler));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ServerError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Transport(e.to_string()))?;

        tracing::info!("HTTP transport stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

async fn handle_rpc(
    State(handler): State<Arc<RpcHandler>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = body.unwrap_or_else(|e| {
        tracing::debug!("Discarding unreadable request body: {e}");
        Bytes::new()
    });
    let request = RpcRequest {
        http_method: method,
        headers,
        remote_addr: connect_info.map(|ConnectInfo(addr)| addr),
        body,
    };
    handler.handle(request).await
}

/// Health check endpoint.
async fn handle_health(State(handler): State<Arc<RpcHandler>>) -> AxumJson<serde_json::Value> {
    AxumJson(serde_json::json!({
        "status": "ok",
        "version": handler.config().version,
        "methods": handler.tree().len(),
    }))
}
