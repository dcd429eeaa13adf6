//! Method resolution against the dotted method tree.

use std::sync::Arc;

use switchboard::{MethodTree, RpcError, RpcMethod};

/// Resolve `path` exactly, or fail with `404 API path not found`.
pub fn resolve(tree: &MethodTree, path: &str) -> Result<Arc<dyn RpcMethod>, RpcError> {
    tree.lookup(path).ok_or_else(|| {
        tracing::debug!("No method registered at {path:?}");
        RpcError::not_found()
    })
}
