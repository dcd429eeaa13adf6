//! Response finalization.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, ACCEPT_RANGES, CONTENT_ENCODING, CONTENT_TYPE, DATE,
    SERVER, USER_AGENT, VARY,
};
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use switchboard::{negotiate, Codec, Envelope, RpcError, COMPRESSION_THRESHOLD};

use super::access_log::{log_fatal, log_request, Severity};
use super::handler::HandlerConfig;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// The parts of the request the finalizer needs.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub remote_addr: Option<SocketAddr>,
    /// Method name as sent by the client, even when validation failed.
    pub method: Option<String>,
    pub user_agent: Option<String>,
    pub accept_encoding: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap, remote_addr: Option<SocketAddr>, method: Option<String>) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            remote_addr,
            method,
            user_agent: header(USER_AGENT),
            accept_encoding: header(ACCEPT_ENCODING),
        }
    }
}

/// Build the HTTP response for a finished call. The status is always 200;
/// failures travel inside the envelope.
pub async fn finalize(
    config: &HandlerConfig,
    codec: &dyn Codec,
    meta: &RequestMeta,
    error: Option<RpcError>,
    response: Value,
) -> Response {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = StatusCode::OK;
    set_fixed_headers(res.headers_mut(), config);

    let envelope = Envelope::new(config.version.as_str(), error, response);
    let mut final_error = envelope.error().cloned();
    let payload = encode(&envelope);

    let compressor = negotiate(meta.accept_encoding.as_deref());
    res.headers_mut()
        .insert(VARY, HeaderValue::from_static("Accept-Encoding"));

    let body = match compressor {
        Some(scheme) if payload.len() >= COMPRESSION_THRESHOLD => {
            match codec.compress(scheme, payload.into_bytes()).await {
                Ok(compressed) => {
                    res.headers_mut()
                        .insert(CONTENT_ENCODING, HeaderValue::from_static(scheme.as_str()));
                    compressed
                }
                Err(e) => {
                    log_fatal("Failed to compress RPC response", &e);
                    let error = RpcError::from(e);
                    let fallback = Envelope::failure(config.version.as_str(), error.clone());
                    final_error = Some(error);
                    encode(&fallback).into_bytes()
                }
            }
        }
        _ => payload.into_bytes(),
    };

    log_request(meta, Severity::for_error(final_error.as_ref()));

    *res.body_mut() = Body::from(body);
    res
}

fn set_fixed_headers(headers: &mut HeaderMap, config: &HandlerConfig) {
    headers.remove(ACCEPT_RANGES);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    if let Ok(server) = HeaderValue::from_str(&config.server_name) {
        headers.insert(SERVER, server);
    }
    if let Ok(date) = HeaderValue::from_str(&http_date()) {
        headers.insert(DATE, date);
    }
}

/// Current time as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn encode(envelope: &Envelope) -> String {
    envelope.to_json().unwrap_or_else(|e| {
        log_fatal("Failed to serialize RPC envelope", &e);
        Envelope::failure(envelope.version(), RpcError::from(e))
            .to_json()
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_date_shape() {
        let date = http_date();
        assert!(date.ends_with(" GMT"));
        assert_eq!(date.len(), "Sun, 06 Nov 1994 08:49:37 GMT".len());
        assert!(chrono::DateTime::parse_from_rfc2822(&date.replace("GMT", "+0000")).is_ok());
    }

    #[test]
    fn test_meta_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        let meta = RequestMeta::from_headers(&headers, None, Some("ping".to_string()));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(meta.accept_encoding.as_deref(), Some("gzip"));
        assert_eq!(meta.method.as_deref(), Some("ping"));
    }
}
