//! Boxed keys
//!
//! A scope cannot be handed back up the call graph, so a callee has no way to
//! publish a value to its caller by layering. A boxed key lets the caller
//! carve out a shared slot first ([`BoxedKey::set_box`]); callees then write
//! into that slot and the caller reads it once control returns.
//!
//! The slot is a `parking_lot::RwLock`, so writers from forked tasks are
//! serialized. Ordering between them is not: the last write wins.

use crate::compose::{ScopeOp, ScopeSet, ScopeWith};
use crate::scope::Scope;
use crate::types::KeyId;
use parking_lot::RwLock;
use std::any::type_name;
use std::fmt;

/// Shared single-value slot, owned by the scope layer that introduced it.
struct ValueBox<V> {
    slot: RwLock<V>,
}

impl<V> ValueBox<V> {
    fn new(value: V) -> Self {
        ValueBox {
            slot: RwLock::new(value),
        }
    }
}

/// Key whose scope entry is a mutable slot rather than the value itself.
pub struct BoxedKey<V> {
    id: KeyId,
    default: V,
}

impl<V> BoxedKey<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a key with a new identity and the given fallback
    pub fn new(default: V) -> Self {
        BoxedKey {
            id: KeyId::next(),
            default,
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Layer a fresh slot holding the fallback.
    ///
    /// Call this in the ancestor that wants to observe later writes.
    pub fn set_box(&self, scope: &Scope) -> Scope {
        scope.with_value(self.id, ValueBox::new(self.default.clone()))
    }

    /// Deferred form of [`BoxedKey::set_box`]
    pub fn with_box(&self) -> ScopeOp {
        let id = self.id;
        let default = self.default.clone();
        ScopeOp::new(move |scope| scope.with_value(id, ValueBox::new(default.clone())))
    }

    /// Write `val` into the nearest slot for this key.
    ///
    /// If a slot exists, it is overwritten and `scope` is returned unchanged.
    /// Otherwise a new slot is layered atop `scope`. In that case only scopes
    /// derived from the returned one see the value: an ancestor still holding
    /// an earlier scope keeps reading the fallback.
    pub fn set(&self, scope: &Scope, val: V) -> Scope {
        write_box(self.id, scope, val)
    }

    pub fn with(&self, val: V) -> ScopeOp {
        let id = self.id;
        ScopeOp::new(move |scope| write_box(id, &scope, val.clone()))
    }

    /// Current slot contents, or the fallback if no slot exists
    pub fn value(&self, scope: &Scope) -> V {
        match scope.get::<ValueBox<V>>(self.id) {
            Some(b) => b.slot.read().clone(),
            None => self.default.clone(),
        }
    }

    /// True if a slot for this key is reachable from `scope`
    pub fn has_box(&self, scope: &Scope) -> bool {
        scope.get::<ValueBox<V>>(self.id).is_some()
    }
}

fn write_box<V>(id: KeyId, scope: &Scope, val: V) -> Scope
where
    V: Send + Sync + 'static,
{
    match scope.get::<ValueBox<V>>(id) {
        Some(b) => {
            *b.slot.write() = val;
            scope.clone()
        }
        None => scope.with_value(id, ValueBox::new(val)),
    }
}

impl<V> fmt::Debug for BoxedKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxedKey<{}>({})", type_name::<V>(), self.id)
    }
}

impl<V> ScopeSet<V> for BoxedKey<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, scope: &Scope, val: V) -> Scope {
        BoxedKey::set(self, scope, val)
    }
}

impl<V> ScopeWith<V> for BoxedKey<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn with(&self, val: V) -> ScopeOp {
        BoxedKey::with(self, val)
    }
}
