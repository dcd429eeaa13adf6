//! Transport layer for the RPC endpoint.

pub mod http;

pub use http::{router, HttpTransport, MAX_BODY_BYTES, RPC_PATH};
