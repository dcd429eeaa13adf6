//! RPC endpoint protocol: validate, resolve, dispatch, finalize.

pub mod access_log;
pub mod finalizer;
pub mod handler;
pub mod resolver;
pub mod validator;

pub use finalizer::RequestMeta;
pub use handler::{normalize_error, HandlerConfig, RpcHandler, RpcRequest};
