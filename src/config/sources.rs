//! Config sources in precedence order: defaults, file, environment.

use super::CtxkeyConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use std::path::Path;

/// Builder seeded with the serialized defaults.
pub(super) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&CtxkeyConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}

/// Add a TOML (or any supported format) file, required to exist.
pub(super) fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).required(true))
}

/// Add environment variable overlay to builder.
/// Uses CTXKEY__ prefix and __ as separator for nested keys.
pub(super) fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("CTXKEY")
            .separator("__")
            .try_parsing(true),
    )
}
