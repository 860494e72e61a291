use crease_core::{MatchId, ValidationError};
use crease_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("persistence conflict on {match_id} after {attempts} attempts")]
    PersistenceConflict { match_id: MatchId, attempts: u32 },

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl EngineError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, reason))
    }

    /// Whether retrying the same command later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::PersistenceConflict { .. })
    }
}
