use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const ENV_PREFIX: &str = "CREASE";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Load-apply-save cycles attempted before a version conflict is surfaced
    pub max_save_attempts: u32,
    /// SQLite database file used by the command line front end
    pub database_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_save_attempts: 3,
            database_path: "crease.db".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `CREASE_*` environment variables
    pub fn from_env() -> Result<Self, EngineError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let parsed: Self = cfg.try_deserialize()?;
        parsed.validate()
    }

    /// Load configuration from file, with environment overrides
    pub fn from_file(path: &str) -> Result<Self, EngineError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let parsed: Self = cfg.try_deserialize()?;
        parsed.validate()
    }

    pub fn validate(self) -> Result<Self, EngineError> {
        if self.max_save_attempts == 0 {
            return Err(EngineError::Config(config::ConfigError::Message(
                "max_save_attempts must be at least 1".into(),
            )));
        }
        Ok(self)
    }
}
