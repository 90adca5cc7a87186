//! redb-based embedded database persistence.

use redb::{Database, ReadableTable, TableDefinition};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

use super::{ArtifactKey, ArtifactStore, CorpusSnapshot};

const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Embedded database persistence using redb.
///
/// All artifacts share one database file; each snapshot is a JSON value under the
/// key's [`storage_key`](ArtifactKey::storage_key). Saves are transactional, so a crash
/// mid-save leaves the previous snapshot intact.
///
/// # Example
///
/// ```rust,no_run
/// use docqa_rag::persistence::{ArtifactKey, ArtifactStore, RedbStore};
///
/// let store = RedbStore::new("./artifacts.redb").unwrap();
/// let key = ArtifactKey::new("alice", "report.pdf").unwrap();
/// let snapshot = store.load(&key).unwrap();
/// ```
pub struct RedbStore {
    path: PathBuf,
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Creates or opens a redb store.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(|e| RagError::Database(e.to_string()))?;

        Ok(Self { path, db })
    }
}

impl ArtifactStore for RedbStore {
    fn save(&self, key: &ArtifactKey, snapshot: &CorpusSnapshot) -> Result<()> {
        let serialized =
            serde_json::to_vec(snapshot).map_err(|e| RagError::Serialization(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| RagError::Database(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(SNAPSHOTS_TABLE)
                .map_err(|e| RagError::Database(e.to_string()))?;
            table
                .insert(key.storage_key().as_str(), serialized.as_slice())
                .map_err(|e| RagError::Database(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| RagError::Database(e.to_string()))?;

        Ok(())
    }

    fn load(&self, key: &ArtifactKey) -> Result<Option<CorpusSnapshot>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| RagError::Database(e.to_string()))?;

        let table = match read_txn.open_table(SNAPSHOTS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(RagError::Database(e.to_string())),
        };

        let Some(value) = table
            .get(key.storage_key().as_str())
            .map_err(|e| RagError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        serde_json::from_slice(value.value())
            .map(Some)
            .map_err(|e| RagError::Serialization(e.to_string()))
    }

    fn remove(&self, key: &ArtifactKey) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| RagError::Database(e.to_string()))?;
        let removed = {
            let mut table = write_txn
                .open_table(SNAPSHOTS_TABLE)
                .map_err(|e| RagError::Database(e.to_string()))?;
            table
                .remove(key.storage_key().as_str())
                .map_err(|e| RagError::Database(e.to_string()))?
                .is_some()
        };
        write_txn
            .commit()
            .map_err(|e| RagError::Database(e.to_string()))?;

        Ok(removed)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
