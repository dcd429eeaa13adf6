//! Core data types: request payloads, response envelopes, and errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client-visible error messages.
pub mod messages {
    pub const INVALID_REQUEST_METHOD: &str = "Invalid request method";
    pub const INVALID_PAYLOAD: &str = "Invalid payload";
    pub const CLIENT_VERSION_MISMATCH: &str = "Client version mismatch";
    pub const API_PATH_NOT_FOUND: &str = "API path not found";
    pub const APPLICATION_ERROR: &str = "Application error";
    pub const REQUEST_TIMED_OUT: &str = "Request timed out";
}

/// Status codes carried inside error envelopes.
pub mod status_codes {
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const GATEWAY_TIMEOUT: u16 = 504;
}

/// Request body as received, before validation.
///
/// Anything that is not a JSON object decodes to the empty payload. String
/// fields that are missing, empty, or not strings decode to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload {
    pub version: Option<String>,
    pub method: Option<String>,
    pub params: Option<Value>,
}

impl RawPayload {
    pub fn from_slice(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut map)) => Self {
                version: take_string(&mut map, "version"),
                method: take_string(&mut map, "method"),
                params: map.remove("params"),
            },
            _ => Self::default(),
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// A validated request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub version: String,
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Error as it travels to the client inside the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcError {
    /// `{"statusCode": 404, "body": "API path not found"}`
    Status {
        #[serde(rename = "statusCode")]
        status_code: u16,
        body: String,
    },
    /// A bare message string, e.g. the masked `"Application error"`.
    Opaque(String),
    /// An unstructured failure without a status code.
    Detailed {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl RpcError {
    pub fn status(status_code: u16, body: impl Into<String>) -> Self {
        RpcError::Status {
            status_code,
            body: body.into(),
        }
    }

    pub fn detailed(message: impl Into<String>) -> Self {
        RpcError::Detailed {
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_request_method() -> Self {
        Self::status(status_codes::BAD_REQUEST, messages::INVALID_REQUEST_METHOD)
    }

    pub fn invalid_payload() -> Self {
        Self::status(status_codes::BAD_REQUEST, messages::INVALID_PAYLOAD)
    }

    pub fn version_mismatch() -> Self {
        Self::status(status_codes::BAD_REQUEST, messages::CLIENT_VERSION_MISMATCH)
    }

    pub fn not_found() -> Self {
        Self::status(status_codes::NOT_FOUND, messages::API_PATH_NOT_FOUND)
    }

    pub fn application_error() -> Self {
        RpcError::Opaque(messages::APPLICATION_ERROR.to_string())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            RpcError::Status { status_code, .. } => Some(*status_code),
            RpcError::Opaque(_) | RpcError::Detailed { .. } => None,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Status { status_code, body } => write!(f, "{status_code} {body}"),
            RpcError::Opaque(message) => write!(f, "{message}"),
            RpcError::Detailed { message, .. } => write!(f, "{message}"),
        }
    }
}

impl From<MethodError> for RpcError {
    fn from(e: MethodError) -> Self {
        match e {
            MethodError::Status { status_code, body } => RpcError::Status { status_code, body },
            MethodError::Unexpected { message, data } => RpcError::Detailed { message, data },
        }
    }
}

impl From<SwitchboardError> for RpcError {
    fn from(e: SwitchboardError) -> Self {
        RpcError::detailed(e.to_string())
    }
}

/// The `{version, error, response}` wrapper sent for every call.
///
/// Fields are private so that `error` and `response` can never both be set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    version: String,
    error: Option<RpcError>,
    response: Option<Value>,
}

impl Envelope {
    pub fn success(version: impl Into<String>, response: Value) -> Self {
        Self {
            version: version.into(),
            error: None,
            response: Some(response),
        }
    }

    pub fn failure(version: impl Into<String>, error: RpcError) -> Self {
        Self {
            version: version.into(),
            error: Some(error),
            response: None,
        }
    }

    /// Build from a dispatch outcome. `response` is dropped when `error` is set.
    pub fn new(version: impl Into<String>, error: Option<RpcError>, response: Value) -> Self {
        match error {
            Some(error) => Self::failure(version, error),
            None => Self::success(version, response),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    /// Compact JSON encoding.
    pub fn to_json(&self) -> SwitchboardResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Error returned by a method or a filter.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MethodError {
    #[error("{status_code} {body}")]
    Status { status_code: u16, body: String },

    #[error("{message}")]
    Unexpected {
        message: String,
        data: Option<Value>,
    },
}

impl MethodError {
    pub fn status(status_code: u16, body: impl Into<String>) -> Self {
        MethodError::Status {
            status_code,
            body: body.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        MethodError::Unexpected {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(self, data: Value) -> Self {
        match self {
            MethodError::Unexpected { message, .. } => MethodError::Unexpected {
                message,
                data: Some(data),
            },
            other => other,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            MethodError::Status { status_code, .. } => Some(*status_code),
            MethodError::Unexpected { .. } => None,
        }
    }

    /// Extra detail attached to an unexpected error.
    pub fn data(&self) -> Option<&Value> {
        match self {
            MethodError::Unexpected { data, .. } => data.as_ref(),
            MethodError::Status { .. } => None,
        }
    }
}

/// Deployment environment the server runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = SwitchboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(SwitchboardError::InvalidEnvironment(s.to_string())),
        }
    }
}

/// Errors raised by the core library.
#[derive(thiserror::Error, Debug)]
pub enum SwitchboardError {
    #[error("Invalid method path: {0:?}")]
    InvalidPath(String),

    #[error("Method path conflict: {0}")]
    PathConflict(String),

    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SwitchboardResult<T> = Result<T, SwitchboardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_payload_full() {
        let raw = RawPayload::from_slice(br#"{"version":"1.0","method":"users.create","params":{"a":1}}"#);
        assert_eq!(raw.version.as_deref(), Some("1.0"));
        assert_eq!(raw.method.as_deref(), Some("users.create"));
        assert_eq!(raw.params, Some(json!({"a": 1})));
    }

    #[test]
    fn test_raw_payload_not_an_object() {
        assert_eq!(RawPayload::from_slice(b"[1,2]"), RawPayload::default());
        assert_eq!(RawPayload::from_slice(b"{\"broken\":"), RawPayload::default());
        assert_eq!(RawPayload::from_slice(b""), RawPayload::default());
    }

    #[test]
    fn test_raw_payload_empty_and_non_string_fields() {
        let raw = RawPayload::from_slice(br#"{"version":"","method":42}"#);
        assert!(raw.version.is_none());
        assert!(raw.method.is_none());
        assert!(raw.params.is_none());
    }

    #[test]
    fn test_envelope_success_layout() {
        let env = Envelope::success("1.0", json!("pong"));
        assert_eq!(
            env.to_json().unwrap(),
            r#"{"version":"1.0","error":null,"response":"pong"}"#
        );
    }

    #[test]
    fn test_envelope_failure_drops_response() {
        let env = Envelope::new("1.0", Some(RpcError::not_found()), json!({"ignored": true}));
        assert!(env.response().is_none());
        assert_eq!(
            env.to_json().unwrap(),
            r#"{"version":"1.0","error":{"statusCode":404,"body":"API path not found"},"response":null}"#
        );
    }

    #[test]
    fn test_opaque_error_is_bare_string() {
        let env = Envelope::failure("2.1", RpcError::application_error());
        let value: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(value["error"], json!("Application error"));
        assert_eq!(RpcError::application_error().status_code(), None);
    }

    #[test]
    fn test_method_error_conversion() {
        let err: RpcError = MethodError::status(409, "Conflict").into();
        assert_eq!(err.status_code(), Some(409));

        let err: RpcError = MethodError::unexpected("db down").with_data(json!({"retry": false})).into();
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"message": "db down", "data": {"retry": false}})
        );
    }

    #[test]
    fn test_method_error_data() {
        let err = MethodError::unexpected("db down").with_data(json!({"retry": false}));
        assert_eq!(err.data(), Some(&json!({"retry": false})));
        assert_eq!(MethodError::status(409, "Conflict").with_data(json!(1)).data(), None);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
        assert!(Environment::default().is_development());
    }
}
