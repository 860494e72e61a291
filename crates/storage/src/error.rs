use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate match: {0}")]
    Duplicate(String),

    #[error("version conflict on {match_id}: expected {expected}, found {found}")]
    VersionConflict {
        match_id: String,
        expected: u64,
        found: u64,
    },

    #[error("corrupt document for {0}: checksum mismatch")]
    Corrupt(String),

    #[error("storage lock poisoned")]
    LockPoisoned,

    #[error("core error: {0}")]
    Core(#[from] crease_core::CoreError),
}
