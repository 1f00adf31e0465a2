//! Configuration
//!
//! Settings for the ambient layers around the keys: logging and the reference
//! request pipeline. Loaded with the `config` crate from defaults, an optional
//! TOML file and `CTXKEY__` environment variables.

mod facade;
mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CtxkeyConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Identity the reference authorization stage attaches to each request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_user_name")]
    pub user_name: String,

    #[serde(default = "default_user_id")]
    pub user_id: u64,
}

fn default_user_name() -> String {
    "Alice".to_string()
}

fn default_user_id() -> u64 {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            user_name: default_user_name(),
            user_id: default_user_id(),
        }
    }
}
