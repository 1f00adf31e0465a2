//! Deferred scope operations and their composition.
//!
//! A [`ScopeOp`] is an "attach one value" step that has not been applied yet.
//! Keys hand them out through [`ScopeWith::with`]; [`compose`] chains any
//! number of them, including other compositions, into a single step.

use crate::scope::Scope;
use std::fmt;
use std::sync::Arc;

/// Reusable, thread-safe operation from one scope to the next
#[derive(Clone)]
pub struct ScopeOp {
    op: Arc<dyn Fn(Scope) -> Scope + Send + Sync>,
}

impl ScopeOp {
    pub fn new<F>(op: F) -> Self
    where
        F: Fn(Scope) -> Scope + Send + Sync + 'static,
    {
        ScopeOp { op: Arc::new(op) }
    }

    /// The operation that returns its input unchanged
    pub fn identity() -> Self {
        ScopeOp::new(|scope| scope)
    }

    pub fn apply(&self, scope: Scope) -> Scope {
        (self.op)(scope)
    }
}

impl fmt::Debug for ScopeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScopeOp")
    }
}

/// Keys that can attach a value to a scope directly.
pub trait ScopeSet<V> {
    fn set(&self, scope: &Scope, val: V) -> Scope;
}

/// Keys that can produce a deferred attach operation.
pub trait ScopeWith<V> {
    fn with(&self, val: V) -> ScopeOp;
}

/// Chain operations left to right; each sees the scope produced by the
/// previous one. An empty chain is the identity.
pub fn compose<I>(ops: I) -> ScopeOp
where
    I: IntoIterator<Item = ScopeOp>,
{
    let ops: Vec<ScopeOp> = ops.into_iter().collect();
    ScopeOp::new(move |scope| ops.iter().fold(scope, |scope, op| op.apply(scope)))
}
