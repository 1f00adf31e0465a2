//! ConfigLoader facade over the layered sources.

use super::sources;
use super::CtxkeyConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<CtxkeyConfig, ApiError> {
        let mut builder = sources::builder_with_defaults()?;
        if let Some(path) = path {
            builder = sources::add_file(builder, path);
        }
        let builder = sources::add_environment(builder);

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<CtxkeyConfig, ApiError> {
        Self::load(Some(path))
    }

    /// Create default configuration.
    pub fn default() -> CtxkeyConfig {
        CtxkeyConfig::default()
    }
}
