//! Dotted-path method tree.
//!
//! The tree is assembled once at startup through [`MethodTreeBuilder`] and is
//! read-only afterwards. `"users.create"` lives at `root["users"]["create"]`.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::filter::CallContext;
use crate::types::{MethodError, SwitchboardError, SwitchboardResult};

/// A server-side method callable over RPC.
#[async_trait]
pub trait RpcMethod: Send + Sync {
    async fn call(&self, ctx: &CallContext) -> Result<Value, MethodError>;
}

/// Adapts an async closure over the call params into an [`RpcMethod`].
pub struct FnMethod<F>(pub F);

#[async_trait]
impl<F, Fut> RpcMethod for FnMethod<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, MethodError>> + Send + 'static,
{
    async fn call(&self, ctx: &CallContext) -> Result<Value, MethodError> {
        (self.0)(ctx.params.clone()).await
    }
}

enum Node {
    Namespace(BTreeMap<String, Node>),
    Method(Arc<dyn RpcMethod>),
}

/// Immutable tree of methods keyed by path segment.
pub struct MethodTree {
    root: BTreeMap<String, Node>,
}

impl MethodTree {
    pub fn builder() -> MethodTreeBuilder {
        MethodTreeBuilder::default()
    }

    /// Resolve an exact dotted path. Namespaces, partial paths, and paths
    /// running past a method all resolve to `None`.
    pub fn lookup(&self, path: &str) -> Option<Arc<dyn RpcMethod>> {
        let segments: Vec<&str> = path.split('.').collect();
        lookup_in(&self.root, &segments)
    }

    /// All registered method paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_paths(&self.root, "", &mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.paths().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl fmt::Debug for MethodTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTree")
            .field("paths", &self.paths())
            .finish()
    }
}

fn lookup_in(level: &BTreeMap<String, Node>, segments: &[&str]) -> Option<Arc<dyn RpcMethod>> {
    let (head, rest) = segments.split_first()?;
    match (level.get(*head)?, rest.is_empty()) {
        (Node::Method(method), true) => Some(Arc::clone(method)),
        (Node::Namespace(children), false) => lookup_in(children, rest),
        _ => None,
    }
}

fn collect_paths(level: &BTreeMap<String, Node>, prefix: &str, out: &mut Vec<String>) {
    for (name, node) in level {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match node {
            Node::Method(_) => out.push(path),
            Node::Namespace(children) => collect_paths(children, &path, out),
        }
    }
}

/// Builder for [`MethodTree`].
#[derive(Default)]
pub struct MethodTreeBuilder {
    root: BTreeMap<String, Node>,
}

impl MethodTreeBuilder {
    /// Register `method` at `path`.
    ///
    /// Fails on empty segments and on paths that collide with an existing
    /// method or namespace.
    pub fn register(
        &mut self,
        path: &str,
        method: Arc<dyn RpcMethod>,
    ) -> SwitchboardResult<&mut Self> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || s.chars().any(char::is_whitespace))
        {
            return Err(SwitchboardError::InvalidPath(path.to_string()));
        }

        insert(&mut self.root, &segments, path, method)?;
        Ok(self)
    }

    pub fn build(self) -> MethodTree {
        MethodTree { root: self.root }
    }
}

fn insert(
    level: &mut BTreeMap<String, Node>,
    segments: &[&str],
    full_path: &str,
    method: Arc<dyn RpcMethod>,
) -> SwitchboardResult<()> {
    let (head, rest) = segments
        .split_first()
        .ok_or_else(|| SwitchboardError::InvalidPath(full_path.to_string()))?;

    if rest.is_empty() {
        if level.contains_key(*head) {
            return Err(SwitchboardError::PathConflict(full_path.to_string()));
        }
        level.insert(head.to_string(), Node::Method(method));
        return Ok(());
    }

    let node = level
        .entry(head.to_string())
        .or_insert_with(|| Node::Namespace(BTreeMap::new()));

    match node {
        Node::Namespace(children) => insert(children, rest, full_path, method),
        Node::Method(_) => Err(SwitchboardError::PathConflict(full_path.to_string())),
    }
}
