//! Plain and defaulting keys.
//!
//! Each key owns a fresh [`KeyId`], so keys are compared by identity and never
//! by name or value type. A key is the only handle that can read back what it
//! attached.

use crate::compose::{ScopeOp, ScopeSet, ScopeWith};
use crate::error::KeyError;
use crate::scope::Scope;
use crate::types::KeyId;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

/// Presence-checked key for values of type `V`.
pub struct Key<V> {
    id: KeyId,
    _value: PhantomData<fn() -> V>,
}

impl<V> Key<V>
where
    V: Send + Sync + 'static,
{
    /// Create a key with a new identity
    pub fn new() -> Self {
        Key {
            id: KeyId::next(),
            _value: PhantomData,
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Layer `val` under this key atop `scope`
    pub fn set(&self, scope: &Scope, val: V) -> Scope {
        scope.with_value(self.id, val)
    }

    /// Deferred form of [`Key::set`]
    pub fn with(&self, val: V) -> ScopeOp
    where
        V: Clone,
    {
        let id = self.id;
        ScopeOp::new(move |scope| scope.with_value(id, val.clone()))
    }

    /// Borrow the most recent value attached under this key
    pub fn get<'a>(&self, scope: &'a Scope) -> Option<&'a V> {
        scope.get::<V>(self.id)
    }

    /// Most recent value attached under this key, if any
    pub fn value(&self, scope: &Scope) -> Option<V>
    where
        V: Clone,
    {
        self.get(scope).cloned()
    }

    /// Like [`Key::value`] but absence is a [`KeyError::MissingKey`]
    pub fn require(&self, scope: &Scope) -> Result<V, KeyError>
    where
        V: Clone,
    {
        self.value(scope).ok_or(KeyError::MissingKey {
            key: self.id,
            type_name: type_name::<V>(),
        })
    }

    /// Like [`Key::require`] but aborts the current call path on absence.
    ///
    /// # Panics
    ///
    /// Panics with a [`KeyError`] payload if nothing was attached.
    pub fn must_value(&self, scope: &Scope) -> V
    where
        V: Clone,
    {
        match self.require(scope) {
            Ok(v) => v,
            Err(err) => err.raise(),
        }
    }
}

impl<V> Default for Key<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Key<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key<{}>({})", type_name::<V>(), self.id)
    }
}

impl<V> ScopeSet<V> for Key<V>
where
    V: Send + Sync + 'static,
{
    fn set(&self, scope: &Scope, val: V) -> Scope {
        Key::set(self, scope, val)
    }
}

impl<V> ScopeWith<V> for Key<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn with(&self, val: V) -> ScopeOp {
        Key::with(self, val)
    }
}

/// Key that reads as a fixed fallback when nothing was attached.
pub struct DefaultingKey<V> {
    id: KeyId,
    default: V,
}

impl<V> DefaultingKey<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a key with a new identity and the given fallback
    pub fn new(default: V) -> Self {
        DefaultingKey {
            id: KeyId::next(),
            default,
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }

    pub fn set(&self, scope: &Scope, val: V) -> Scope {
        scope.with_value(self.id, val)
    }

    pub fn with(&self, val: V) -> ScopeOp {
        let id = self.id;
        ScopeOp::new(move |scope| scope.with_value(id, val.clone()))
    }

    /// Attached value, or the fallback
    pub fn value(&self, scope: &Scope) -> V {
        scope
            .get::<V>(self.id)
            .unwrap_or(&self.default)
            .clone()
    }

    /// Attached value or fallback, rejecting the type's empty value.
    ///
    /// Only meaningful when `V::default()` is never a legitimate value.
    /// An explicitly attached empty value is still an error.
    pub fn require_non_empty(&self, scope: &Scope) -> Result<V, KeyError>
    where
        V: PartialEq + Default,
    {
        let v = self.value(scope);
        if v == V::default() {
            return Err(KeyError::EmptyValue {
                key: self.id,
                type_name: type_name::<V>(),
            });
        }
        Ok(v)
    }

    /// # Panics
    ///
    /// Panics with a [`KeyError`] payload when the resolved value is empty.
    pub fn must_non_empty_value(&self, scope: &Scope) -> V
    where
        V: PartialEq + Default,
    {
        match self.require_non_empty(scope) {
            Ok(v) => v,
            Err(err) => err.raise(),
        }
    }
}

impl<V> fmt::Debug for DefaultingKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultingKey<{}>({})", type_name::<V>(), self.id)
    }
}

impl<V> ScopeSet<V> for DefaultingKey<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, scope: &Scope, val: V) -> Scope {
        DefaultingKey::set(self, scope, val)
    }
}

impl<V> ScopeWith<V> for DefaultingKey<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn with(&self, val: V) -> ScopeOp {
        DefaultingKey::with(self, val)
    }
}
