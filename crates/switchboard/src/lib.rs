//! Core library for a single-endpoint JSON RPC gateway.
//!
//! Holds everything that does not know about HTTP: request payloads, the
//! response envelope, the dotted method tree, the filter chain that wraps
//! method invocation, and the response compression codecs.

pub mod compression;
pub mod filter;
pub mod registry;
pub mod types;

pub use compression::{negotiate, Codec, Compressor, FlateCodec, COMPRESSION_THRESHOLD};
pub use filter::{CallContext, Filter, FilterChain, FilterChainBuilder};
pub use registry::{FnMethod, MethodTree, MethodTreeBuilder, RpcMethod};
pub use types::*;
