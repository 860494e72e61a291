use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crease_core::{Match, MatchId};

use crate::error::StorageError;
use crate::traits::MatchStore;

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn checksum(document: &[u8]) -> [u8; 32] {
    *blake3::hash(document).as_bytes()
}

/// Match documents in a single SQLite table, one MessagePack blob per match.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn stored_version(conn: &Connection, match_id: MatchId) -> Result<Option<u64>, StorageError> {
        let version: Option<i64> = conn
            .query_row(
                "SELECT version FROM matches WHERE match_id = ?1",
                rusqlite::params![match_id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.map(|v| v as u64))
    }
}

impl MatchStore for SqliteStore {
    fn insert(&self, doc: &Match) -> Result<(), StorageError> {
        let document = doc.to_msgpack()?;
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO matches (match_id, version, document, checksum, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                doc.match_id.as_bytes().as_slice(),
                doc.version as i64,
                document,
                &checksum(&document)[..],
                doc.status.as_str(),
            ],
        );
        match result {
            Ok(_) => {
                debug!(match_id = %doc.match_id, "match inserted");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::Duplicate(doc.match_id.to_string()))
            }
            Err(e) => Err(StorageError::Sqlite(e)),
        }
    }

    fn load(&self, match_id: MatchId) -> Result<Option<Match>, StorageError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT version, document, checksum FROM matches WHERE match_id = ?1",
                rusqlite::params![match_id.as_bytes().as_slice()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((version, document, stored_checksum)) = row else {
            return Ok(None);
        };

        if checksum(&document) != to_array::<32>(stored_checksum, "checksum")? {
            return Err(StorageError::Corrupt(match_id.to_string()));
        }
        let mut doc = Match::from_msgpack(&document)?;
        // The row is authoritative for the version.
        doc.version = version as u64;
        Ok(Some(doc))
    }

    fn save(&self, doc: &Match) -> Result<u64, StorageError> {
        let document = doc.to_msgpack()?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE matches SET version = version + 1, document = ?1, checksum = ?2, status = ?3,
                 updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)
             WHERE match_id = ?4 AND version = ?5",
            rusqlite::params![
                document,
                &checksum(&document)[..],
                doc.status.as_str(),
                doc.match_id.as_bytes().as_slice(),
                doc.version as i64,
            ],
        )?;

        if updated == 0 {
            return match Self::stored_version(&conn, doc.match_id)? {
                None => Err(StorageError::NotFound(doc.match_id.to_string())),
                Some(found) => Err(StorageError::VersionConflict {
                    match_id: doc.match_id.to_string(),
                    expected: doc.version,
                    found,
                }),
            };
        }

        let version = doc.version + 1;
        debug!(match_id = %doc.match_id, version, "match saved");
        Ok(version)
    }

    fn list(&self) -> Result<Vec<MatchId>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT match_id FROM matches ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(MatchId::from_bytes(to_array::<16>(row?, "match_id")?));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_core::{MatchSetup, MatchStatus, TeamSetup};

    fn new_match() -> Match {
        let team = |name: &str| TeamSetup {
            name: name.into(),
            players: (1..=11).map(|i| format!("{name} {i}")).collect(),
            substitutes: Vec::new(),
            captain: None,
        };
        Match::from_setup(&MatchSetup {
            overs: 5,
            team_a: team("North"),
            team_b: team("South"),
        })
        .unwrap()
    }

    #[test]
    fn insert_then_load() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        let m = new_match();
        store.insert(&m)?;
        assert_eq!(store.load(m.match_id)?, Some(m));
        Ok(())
    }

    #[test]
    fn schema_version_recorded_once() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        let conn = store.conn()?;
        crate::schema::init_schema(&conn)?;
        let versions: Vec<i32> = conn
            .prepare("SELECT version FROM schema_version")?
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        assert_eq!(versions, vec![crate::schema::SCHEMA_VERSION]);
        Ok(())
    }

    #[test]
    fn load_unknown_is_none() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        assert!(store.load(MatchId::new())?.is_none());
        Ok(())
    }

    #[test]
    fn duplicate_insert_rejected() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        let m = new_match();
        store.insert(&m)?;
        assert!(matches!(store.insert(&m), Err(StorageError::Duplicate(_))));
        Ok(())
    }

    #[test]
    fn save_bumps_version() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        let mut m = new_match();
        store.insert(&m)?;

        m.status = MatchStatus::TossDone;
        assert_eq!(store.save(&m)?, 1);
        let loaded = store.load(m.match_id)?.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.status, MatchStatus::TossDone);
        Ok(())
    }

    #[test]
    fn stale_save_conflicts() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        let m = new_match();
        store.insert(&m)?;

        let first = store.load(m.match_id)?.unwrap();
        let mut second = store.load(m.match_id)?.unwrap();
        store.save(&first)?;

        second.status = MatchStatus::Abandoned;
        match store.save(&second) {
            Err(StorageError::VersionConflict {
                expected, found, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(found, 1);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        // The losing write left nothing behind.
        assert_eq!(store.load(m.match_id)?.unwrap().status, MatchStatus::NoToss);
        Ok(())
    }

    #[test]
    fn save_unknown_is_not_found() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        assert!(matches!(store.save(&new_match()), Err(StorageError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn checksum_mismatch_is_corrupt() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        let m = new_match();
        store.insert(&m)?;
        store.conn()?.execute(
            "UPDATE matches SET checksum = zeroblob(32) WHERE match_id = ?1",
            rusqlite::params![m.match_id.as_bytes().as_slice()],
        )?;
        assert!(matches!(store.load(m.match_id), Err(StorageError::Corrupt(_))));
        Ok(())
    }

    #[test]
    fn list_in_insertion_order() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        let (a, b) = (new_match(), new_match());
        store.insert(&a)?;
        store.insert(&b)?;
        assert_eq!(store.list()?, vec![a.match_id, b.match_id]);
        Ok(())
    }

    #[test]
    fn file_store_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("crease.db");
        let path = path.to_str().ok_or("non-utf8 temp path")?;
        let m = new_match();
        {
            let store = SqliteStore::open(path)?;
            store.insert(&m)?;
            store.save(&m)?;
        }
        let store = SqliteStore::open(path)?;
        let loaded = store.load(m.match_id)?.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.team_a, m.team_a);
        Ok(())
    }
}
