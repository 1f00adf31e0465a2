//! Error types for key access and the ambient layers.

use crate::types::KeyId;
use thiserror::Error;

/// Failure of a required key access.
///
/// Both variants mark a programmer invariant violation (an upstream stage
/// that should have attached the value did not run). `require*` accessors
/// return them; `must_*` accessors raise them as a panic payload that
/// unwinds only the current thread or task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("could not find value for key {key} ({type_name}) in scope")]
    MissingKey {
        key: KeyId,
        type_name: &'static str,
    },

    #[error("could not find non-empty value for key {key} ({type_name}) in scope")]
    EmptyValue {
        key: KeyId,
        type_name: &'static str,
    },
}

impl KeyError {
    /// Identity of the key that failed
    pub fn key(&self) -> KeyId {
        match self {
            KeyError::MissingKey { key, .. } | KeyError::EmptyValue { key, .. } => *key,
        }
    }

    /// Raise this error as a panic payload.
    ///
    /// The payload is the `KeyError` itself so a supervisor can downcast it.
    pub(crate) fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}

/// Errors from configuration, logging setup and request dispatch
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl From<::config::ConfigError> for ApiError {
    fn from(err: ::config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
