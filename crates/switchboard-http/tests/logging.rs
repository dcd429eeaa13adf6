//! Log output of the endpoint: masked errors keep their detail in the log,
//! and every request produces one access line.
//!
//! Kept in its own test binary so the scoped subscriber sees every event.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use serde_json::{json, Value};

use switchboard::{CallContext, Environment, FilterChain, MethodError, MethodTree, RpcMethod};
use switchboard_http::methods::Ping;
use switchboard_http::protocol::{HandlerConfig, RpcHandler, RpcRequest};

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct LeakySecret;

#[async_trait]
impl RpcMethod for LeakySecret {
    async fn call(&self, _ctx: &CallContext) -> Result<Value, MethodError> {
        Err(MethodError::unexpected("password=hunter2 rejected by upstream")
            .with_data(json!({"query_id": "Q-7781"})))
    }
}

fn handler() -> RpcHandler {
    let mut builder = MethodTree::builder();
    builder
        .register("ping", Arc::new(Ping))
        .unwrap()
        .register("vault.open", Arc::new(LeakySecret))
        .unwrap();
    RpcHandler::new(
        builder.build(),
        FilterChain::empty(),
        HandlerConfig::new("1.0", Environment::Production),
    )
}

fn request(method: &str) -> RpcRequest {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static("probe/2.0"));
    RpcRequest {
        http_method: Method::POST,
        headers,
        remote_addr: Some("10.1.2.3:4567".parse().unwrap()),
        body: Bytes::from(json!({"version": "1.0", "method": method}).to_string()),
    }
}

async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_masked_error_detail_goes_to_log() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let handler = handler();

    let res = handler.handle(request("vault.open")).await;
    let envelope = body_json(res.into_body()).await;
    assert_eq!(envelope["error"], json!("Application error"));
    assert!(!envelope.to_string().contains("hunter2"));
    assert!(!envelope.to_string().contains("Q-7781"));

    let output = logs.contents();
    assert!(
        output.contains("password=hunter2 rejected by upstream"),
        "log output: {output}"
    );
    assert!(output.contains("Q-7781"), "log output: {output}");
    assert!(output.contains("fatal"), "log output: {output}");
    assert!(output.contains("10.1.2.3:4567 - vault.open() - \"probe/2.0\""), "log output: {output}");

    let res = handler.handle(request("ping")).await;
    let envelope = body_json(res.into_body()).await;
    assert_eq!(envelope["response"], json!("pong"));

    let output = logs.contents();
    assert!(output.contains("10.1.2.3:4567 - ping() - \"probe/2.0\""), "log output: {output}");
    assert_eq!(output.matches("switchboard::rpc").count(), 2, "log output: {output}");
}
