use crease_core::{Match, MatchId};

use crate::error::StorageError;

/// Document store holding one match per id.
///
/// `save` is an atomic replace guarded by the document's `version`: it fails
/// with [`StorageError::VersionConflict`] when the stored copy has moved on
/// since the caller loaded it.
pub trait MatchStore: Send + Sync {
    fn insert(&self, doc: &Match) -> Result<(), StorageError>;

    fn load(&self, match_id: MatchId) -> Result<Option<Match>, StorageError>;

    /// Replace the stored document, returning its new version.
    fn save(&self, doc: &Match) -> Result<u64, StorageError>;

    fn list(&self) -> Result<Vec<MatchId>, StorageError>;
}
