//! Per-request access logging.
//!
//! `tracing` has no fatal level, so fatal events are emitted at `ERROR`
//! with `severity = "fatal"`.

use std::fmt::Display;

use switchboard::{MethodError, RpcError};

use super::finalizer::RequestMeta;

/// Target for the one-line-per-request access log.
pub const ACCESS_LOG_TARGET: &str = "switchboard::rpc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
    Fatal,
}

impl Severity {
    /// `Info` without an error, `Error` for status >= 400, `Fatal` for any
    /// other error (no status code, or a status below 400).
    pub fn for_error(error: Option<&RpcError>) -> Self {
        match error.map(RpcError::status_code) {
            None => Severity::Info,
            Some(Some(code)) if code >= 400 => Severity::Error,
            Some(_) => Severity::Fatal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

/// Emit the access line for a finished request.
pub fn log_request(meta: &RequestMeta, severity: Severity) {
    let remote_addr = meta
        .remote_addr
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = meta.method.as_deref().unwrap_or("-");
    let user_agent = meta.user_agent.as_deref().unwrap_or("-");

    match severity {
        Severity::Info => tracing::info!(
            target: ACCESS_LOG_TARGET,
            remote_addr = %remote_addr,
            method = %method,
            user_agent = %user_agent,
            severity = severity.as_str(),
            "{remote_addr} - {method}() - \"{user_agent}\""
        ),
        Severity::Error | Severity::Fatal => tracing::error!(
            target: ACCESS_LOG_TARGET,
            remote_addr = %remote_addr,
            method = %method,
            user_agent = %user_agent,
            severity = severity.as_str(),
            "{remote_addr} - {method}() - \"{user_agent}\""
        ),
    }
}

/// Log an unexpected failure with its full detail.
pub fn log_fatal(context: &str, detail: &dyn Display) {
    tracing::error!(severity = "fatal", "{context}: {detail}");
}

/// Log a status-less method error, including any attached data.
pub fn log_application_error(error: &MethodError) {
    match error.data() {
        Some(data) => tracing::error!(
            severity = "fatal",
            data = %data,
            "Unhandled application error: {error}"
        ),
        None => log_fatal("Unhandled application error", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_rules() {
        assert_eq!(Severity::for_error(None), Severity::Info);
        assert_eq!(Severity::for_error(Some(&RpcError::not_found())), Severity::Error);
        assert_eq!(Severity::for_error(Some(&RpcError::status(500, "boom"))), Severity::Error);
        assert_eq!(Severity::for_error(Some(&RpcError::status(302, "moved"))), Severity::Fatal);
        assert_eq!(Severity::for_error(Some(&RpcError::application_error())), Severity::Fatal);
        assert_eq!(Severity::for_error(Some(&RpcError::detailed("gzip failed"))), Severity::Fatal);
    }
}
