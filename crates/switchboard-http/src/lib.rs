//! Switchboard HTTP endpoint. One JSON route in, one JSON envelope out.

pub mod config;
pub mod methods;
pub mod protocol;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::{HandlerConfig, RpcHandler, RpcRequest};
pub use transport::HttpTransport;
