//! Request validation. Rules are checked in order; the first failure wins.

use axum::http::Method;
use serde_json::{Map, Value};

use switchboard::{RawPayload, RequestPayload, RpcError};

/// Validate an incoming call against the running server version.
pub fn validate_request(
    http_method: &Method,
    raw: RawPayload,
    server_version: &str,
) -> Result<RequestPayload, RpcError> {
    if *http_method != Method::POST {
        return Err(RpcError::invalid_request_method());
    }

    let (version, method) = match (raw.version, raw.method) {
        (Some(version), Some(method)) => (version, method),
        _ => return Err(RpcError::invalid_payload()),
    };

    let params = match raw.params {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(RpcError::invalid_payload()),
    };

    // Clients compare versions on their own; this rejection is informational.
    if version != server_version {
        tracing::debug!("Client version {version} does not match server {server_version}");
        return Err(RpcError::version_mismatch());
    }

    Ok(RequestPayload {
        version,
        method,
        params,
    })
}
