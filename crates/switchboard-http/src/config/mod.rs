//! Configuration loading and resolution.
//!
//! Every setting resolves as CLI flag > environment variable > default.

use std::time::Duration;

use switchboard::Environment;

use crate::protocol::HandlerConfig;
use crate::types::{ServerError, ServerResult};

pub const DEFAULT_ADDR: &str = "127.0.0.1:3200";
pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 30_000;

pub const ENV_ADDR: &str = "SWITCHBOARD_ADDR";
pub const ENV_API_VERSION: &str = "SWITCHBOARD_API_VERSION";
pub const ENV_ENVIRONMENT: &str = "SWITCHBOARD_ENV";
pub const ENV_DISPATCH_TIMEOUT_MS: &str = "SWITCHBOARD_DISPATCH_TIMEOUT_MS";

/// Value sent in the `Server` response header.
pub fn server_name() -> String {
    format!("Switchboard/{}", env!("CARGO_PKG_VERSION"))
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub addr: Option<String>,
    pub api_version: Option<String>,
    pub environment: Option<String>,
    pub dispatch_timeout_ms: Option<u64>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    /// Protocol version clients must send and the envelope reports.
    pub version: String,
    pub environment: Environment,
    pub server_name: String,
    /// `None` disables the dispatch timeout.
    pub dispatch_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> ServerResult<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable source.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> ServerResult<Self> {
        let addr = overrides
            .addr
            .or_else(|| env(ENV_ADDR))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());

        let version = overrides
            .api_version
            .or_else(|| env(ENV_API_VERSION))
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        if version.is_empty() {
            return Err(ServerError::Config("API version must not be empty".to_string()));
        }

        let environment = match overrides.environment.or_else(|| env(ENV_ENVIRONMENT)) {
            Some(raw) => raw.parse::<Environment>()?,
            None => Environment::default(),
        };

        let timeout_ms = match overrides.dispatch_timeout_ms {
            Some(ms) => ms,
            None => match env(ENV_DISPATCH_TIMEOUT_MS) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                    ServerError::Config(format!("{ENV_DISPATCH_TIMEOUT_MS}={raw:?}: {e}"))
                })?,
                None => DEFAULT_DISPATCH_TIMEOUT_MS,
            },
        };
        let dispatch_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        Ok(Self {
            addr,
            version,
            environment,
            server_name: server_name(),
            dispatch_timeout,
        })
    }

    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            version: self.version.clone(),
            environment: self.environment,
            server_name: self.server_name.clone(),
            dispatch_timeout: self.dispatch_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve_with(ConfigOverrides::default(), vars(&[])).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(
            config.dispatch_timeout,
            Some(Duration::from_millis(DEFAULT_DISPATCH_TIMEOUT_MS))
        );
        assert!(config.server_name.starts_with("Switchboard/"));
    }

    #[test]
    fn test_env_vars_apply() {
        let config = ServerConfig::resolve_with(
            ConfigOverrides::default(),
            vars(&[
                (ENV_ADDR, "0.0.0.0:9000"),
                (ENV_API_VERSION, "3.2.1"),
                (ENV_ENVIRONMENT, "production"),
                (ENV_DISPATCH_TIMEOUT_MS, "0"),
            ]),
        )
        .unwrap();
        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.version, "3.2.1");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.dispatch_timeout, None);
    }

    #[test]
    fn test_flags_beat_env_vars() {
        let overrides = ConfigOverrides {
            addr: Some("127.0.0.1:1".to_string()),
            api_version: Some("1.0".to_string()),
            environment: Some("test".to_string()),
            dispatch_timeout_ms: Some(250),
        };
        let config = ServerConfig::resolve_with(
            overrides,
            vars(&[(ENV_API_VERSION, "9.9"), (ENV_ENVIRONMENT, "production")]),
        )
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:1");
        assert_eq!(config.version, "1.0");
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.dispatch_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ServerConfig::resolve_with(
            ConfigOverrides::default(),
            vars(&[(ENV_ENVIRONMENT, "staging")])
        )
        .is_err());
        assert!(ServerConfig::resolve_with(
            ConfigOverrides::default(),
            vars(&[(ENV_DISPATCH_TIMEOUT_MS, "soon")])
        )
        .is_err());
        assert!(ServerConfig::resolve_with(
            ConfigOverrides {
                api_version: Some(String::new()),
                ..Default::default()
            },
            vars(&[])
        )
        .is_err());
    }
}
