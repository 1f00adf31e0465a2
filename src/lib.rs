//! ctxkey: Typed Keys for Request-Scoped Values
//!
//! Values travel through a call graph inside an immutable, chained [`Scope`].
//! Keys are identity tokens: each constructor call yields a key no other key
//! can read through, and each key only ever returns values of its own type.
//!
//! - [`Key`]: presence-checked accessor.
//! - [`DefaultingKey`]: returns a fixed fallback when nothing was attached.
//! - [`BoxedKey`]: stores a shared slot so callees can publish a value back
//!   to the caller that installed it.
//! - [`compose`]: chains deferred attach operations into one.

pub mod boxed;
pub mod compose;
pub mod config;
pub mod error;
pub mod key;
pub mod logging;
pub mod pipeline;
pub mod scope;
pub mod types;

pub use boxed::BoxedKey;
pub use compose::{compose, ScopeOp, ScopeSet, ScopeWith};
pub use error::{ApiError, KeyError};
pub use key::{DefaultingKey, Key};
pub use scope::Scope;
pub use types::KeyId;
