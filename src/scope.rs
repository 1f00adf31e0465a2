//! Scope
//!
//! Immutable, append-only chain of (key identity, value) layers passed
//! explicitly through a call graph. Each layer shares its parent, so many
//! child branches can grow from one ancestor; nothing is mutated in place.
//! Lookups walk from the most recent layer to the oldest.

use crate::types::KeyId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased value slot. Only the key that wrote it knows the concrete type.
type Erased = Arc<dyn Any + Send + Sync>;

struct Layer {
    key: KeyId,
    value: Erased,
    parent: Scope,
}

/// Request-scoped value chain.
///
/// Cloning is cheap (one reference count) and clones observe exactly the
/// same layers.
#[derive(Clone, Default)]
pub struct Scope {
    head: Option<Arc<Layer>>,
}

impl Scope {
    /// The empty root scope
    pub fn background() -> Self {
        Scope { head: None }
    }

    /// True if no value has been layered on this scope
    pub fn is_background(&self) -> bool {
        self.head.is_none()
    }

    /// Number of layers between this scope and the root
    pub fn depth(&self) -> usize {
        self.layers().count()
    }

    /// Layer one value under `key` atop this scope
    pub(crate) fn with_value<V>(&self, key: KeyId, value: V) -> Scope
    where
        V: Any + Send + Sync,
    {
        Scope {
            head: Some(Arc::new(Layer {
                key,
                value: Arc::new(value),
                parent: self.clone(),
            })),
        }
    }

    /// Most recent value under `key`, if its type is `V`.
    ///
    /// A value of another type under the same identity reads as absent.
    pub(crate) fn get<V>(&self, key: KeyId) -> Option<&V>
    where
        V: Any + Send + Sync,
    {
        self.layers()
            .find(|layer| layer.key == key)
            .and_then(|layer| layer.value.downcast_ref::<V>())
    }

    fn layers(&self) -> Layers<'_> {
        Layers {
            next: self.head.as_deref(),
        }
    }
}

struct Layers<'a> {
    next: Option<&'a Layer>,
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a Layer;

    fn next(&mut self) -> Option<Self::Item> {
        let layer = self.next?;
        self.next = layer.parent.head.as_deref();
        Some(layer)
    }
}

impl Drop for Scope {
    // Unlink uniquely owned layers one at a time so very deep chains do not
    // recurse on drop.
    fn drop(&mut self) {
        let mut head = self.head.take();
        while let Some(layer) = head {
            match Arc::try_unwrap(layer) {
                Ok(mut layer) => head = layer.parent.head.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.layers().map(|layer| layer.key))
            .finish()
    }
}
